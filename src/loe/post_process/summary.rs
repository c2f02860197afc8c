//! Project Summary pipeline.

use std::sync::LazyLock;

use regex::Regex;

use super::{checkboxes_to_bullets, strip_orphan_blockquotes};
use crate::domain::schema::ProjectSchema;
use crate::loe::defaults::DocumentDefaults;
use crate::loe::derive::{device_totals_sentence, primary_site_line};
use crate::loe::markdown::{collapse_blank_lines, fold_heading, remove_tables, MarkdownDocument, Section};
use crate::loe::tables::{
    multi_site_bom, site_overview_table, wave_allocation_table, BOM_TABLE_HEADER, SITE_OVERVIEW_HEADER,
};

const SUMMARY_HEADING: &str = "Project Summary";
const BOM_SECTION_HEADING: &str = "Bill of Materials by Site";
const NO_BOM_MARKER: &str = "_(No BOM items provided)_";
const DEVICE_TOTALS_TOKEN: &str = "{{DEVICE_TOTALS_SENTENCE}}";

static SUMMARY_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]{0,3}(?:#{1,6}[ \t]*)?Project Summary[ \t]*:?[ \t]*#*[ \t]*$").expect("valid regex")
});
static BOM_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*BOM_TABLE\s*\}\}|\{\s*BOM_TABLE\s*\}|\(\s*BOM_TABLE\s*\)|\bBOM_TABLE\b").expect("valid regex")
});
static WAVE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*WAVE_PLAN_TABLE\s*\}\}").expect("valid regex"));
static DEVICE_TOTALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*\*Device totals:\*\*").expect("valid regex"));
static FIELD_ENGINEER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)field\s+engineer[^\n]*tools").expect("valid regex"));
static KEY_TASKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^(?P<header>[ \t]*[-*][ \t]*Key tasks[^\n]*)(?P<body>(?:\n[ \t]*[-*][ \t]+[^\n]*)*)")
        .expect("valid regex")
});
static DANGLING_KEY_TASKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*[-*][ \t]*Key tasks:[ \t]*\n").expect("valid regex"));
static SERVICES_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*services?\s*$").expect("valid regex"));

pub(super) fn process(schema: &ProjectSchema, draft: &str, defaults: &DocumentDefaults) -> String {
    let mut text = ensure_heading(draft.trim());
    text = substitute_placeholders(&text, schema);
    text = add_opening_sentence(&text, schema, &defaults.provider);
    text = ensure_field_engineer_block(&text, &defaults.field_engineer_tools);
    text = place_bom_tables(&text, schema);
    text = place_wave_table(&text, schema);
    text = place_device_totals(&text, schema);
    text = prune_key_tasks(&text, schema);
    text = checkboxes_to_bullets(&text);
    text = DANGLING_KEY_TASKS_RE.replace_all(&text, "").into_owned();
    text = strip_orphan_blockquotes(&text);
    // Anchored on final content so a second pass finds the same spot.
    text = enforce_site_overview(&text, schema);
    text = dedupe_overview_tables(&text);
    collapse_blank_lines(&text)
}

fn is_summary_section(s: &Section) -> bool {
    fold_heading(&s.heading) == "project summary"
}

/// Rewrite the first Project Summary heading to `###`, or prepend one.
fn ensure_heading(text: &str) -> String {
    if SUMMARY_HEADING_RE.is_match(text) {
        SUMMARY_HEADING_RE
            .replace(text, format!("### {SUMMARY_HEADING}").as_str())
            .into_owned()
    } else if text.is_empty() {
        format!("### {SUMMARY_HEADING}")
    } else {
        format!("### {SUMMARY_HEADING}\n\n{text}")
    }
}

fn substitute_placeholders(text: &str, schema: &ProjectSchema) -> String {
    let client = match schema.client.trim() {
        "" => "(Client)",
        c => c,
    };
    let site = primary_site_line(schema).unwrap_or_else(|| "(TBD)".to_string());
    text.replace("{{CLIENT}}", client)
        .replace("{{PRIMARY_SITE}}", &site)
}

fn first_paragraph(body: &str) -> &str {
    body.split("\n\n").next().unwrap_or("")
}

/// `<Client> has engaged <Provider> to deliver <service> services at <site>.`
fn opening_sentence(schema: &ProjectSchema, provider: &str) -> Option<String> {
    let client = schema.client.trim();
    if client.is_empty() {
        return None;
    }
    let service = SERVICES_SUFFIX_RE.replace(schema.service.trim(), "");
    let service = if service.is_empty() { "rack & stack".into() } else { service };
    Some(match primary_site_line(schema) {
        Some(site) => format!("{client} has engaged {provider} to deliver {service} services at {site}."),
        None => format!("{client} has engaged {provider} to deliver {service} services."),
    })
}

fn add_opening_sentence(text: &str, schema: &ProjectSchema, provider: &str) -> String {
    let Some(sentence) = opening_sentence(schema, provider) else {
        return text.to_string();
    };
    let client = schema.client.trim().to_lowercase();

    let mut doc = MarkdownDocument::parse(text);
    let Some(section) = doc.find_mut(is_summary_section) else {
        return text.to_string();
    };
    if first_paragraph(&section.body).to_lowercase().contains(&client) {
        return text.to_string();
    }
    section.body = if section.body.is_empty() {
        sentence
    } else {
        format!("{sentence}\n\n{}", section.body)
    };
    doc.render()
}

/// Insert `block` ahead of byte offset `at`, separated by blank lines.
fn insert_block(text: &str, at: usize, block: &str) -> String {
    let head = text[..at].trim_end();
    let tail = &text[at..];
    if head.is_empty() {
        format!("{block}\n\n{tail}")
    } else {
        format!("{head}\n\n{block}\n\n{tail}")
    }
}

fn ensure_field_engineer_block(text: &str, block: &str) -> String {
    if FIELD_ENGINEER_RE.is_match(text) {
        return text.to_string();
    }
    if let Some(m) = BOM_TOKEN_RE.find(text) {
        return insert_block(text, m.start(), block);
    }
    let totals = text
        .find(DEVICE_TOTALS_TOKEN)
        .or_else(|| DEVICE_TOTALS_RE.find(text).map(|m| m.start()));
    match totals {
        Some(at) => insert_block(text, at, block),
        None => format!("{}\n\n{block}", text.trim_end()),
    }
}

/// First match becomes `replacement`, later matches are removed.
fn replace_first_remove_rest(re: &Regex, text: &str, replacement: &str) -> String {
    let mut first = true;
    re.replace_all(text, |_: &regex::Captures| {
        if std::mem::take(&mut first) {
            replacement.to_string()
        } else {
            String::new()
        }
    })
    .into_owned()
}

fn place_bom_tables(text: &str, schema: &ProjectSchema) -> String {
    let bom_md = multi_site_bom(schema);

    if BOM_TOKEN_RE.is_match(text) {
        let replacement = if bom_md.is_empty() {
            NO_BOM_MARKER.to_string()
        } else {
            format!("\n\n{bom_md}\n\n")
        };
        return replace_first_remove_rest(&BOM_TOKEN_RE, text, &replacement);
    }

    if bom_md.is_empty() || text.contains(BOM_TABLE_HEADER) {
        return text.to_string();
    }

    let mut doc = MarkdownDocument::parse(text);
    match doc.find_mut(|s| fold_heading(&s.heading).contains("bill of materials")) {
        Some(section) => {
            section.body = format!("{}\n\n{bom_md}", section.body);
        }
        None => doc.push(Section::new(BOM_SECTION_HEADING, bom_md)),
    }
    doc.render()
}

fn place_wave_table(text: &str, schema: &ProjectSchema) -> String {
    if !WAVE_TOKEN_RE.is_match(text) {
        return text.to_string();
    }
    let table = wave_allocation_table(schema);
    let replacement = if table.is_empty() {
        String::new()
    } else {
        format!("\n\n{table}\n\n")
    };
    replace_first_remove_rest(&WAVE_TOKEN_RE, text, &replacement)
}

fn place_device_totals(text: &str, schema: &ProjectSchema) -> String {
    let sentence = device_totals_sentence(schema);
    if let Some((head, tail)) = text.split_once(DEVICE_TOTALS_TOKEN) {
        return format!("{head}{sentence}{}", tail.replace(DEVICE_TOTALS_TOKEN, ""));
    }
    if DEVICE_TOTALS_RE.is_match(text) {
        return text.to_string();
    }
    format!("{}\n\n{sentence}", text.trim_end())
}

/// Drop Key-tasks bullets for phases the global scope does not include.
fn prune_key_tasks(text: &str, schema: &ProjectSchema) -> String {
    let Some(caps) = KEY_TASKS_RE.captures(text) else {
        return text.to_string();
    };
    let (Some(whole), Some(header), Some(body)) = (caps.get(0), caps.name("header"), caps.name("body")) else {
        return text.to_string();
    };
    if body.as_str().is_empty() {
        return text.to_string();
    }

    let survey_in = schema.global_scope.site_survey.include == Some(true);
    let post_in = schema.global_scope.post_install.include == Some(true);

    let kept: Vec<&str> = body
        .as_str()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter(|line| {
            let l = line.to_lowercase();
            let survey = l.contains("site survey");
            let post = l.contains("post-install") || l.contains("post install");
            !(survey && !survey_in) && !(post && !post_in)
        })
        .collect();

    let replacement = if kept.is_empty() {
        String::new()
    } else {
        format!("{}\n{}", header.as_str(), kept.join("\n"))
    };
    format!("{}{replacement}{}", &text[..whole.start()], &text[whole.end()..])
}

/// Tables rendered by this pass from schema data, as opposed to model tables.
fn is_rendered_table(header: &str) -> bool {
    header == BOM_TABLE_HEADER || header.starts_with("| Wave |")
}

/// Put exactly one canonical site overview table after the first paragraph
/// of the Project Summary section.
fn enforce_site_overview(text: &str, schema: &ProjectSchema) -> String {
    let mut doc = MarkdownDocument::parse(text);
    let Some(section) = doc.find_mut(is_summary_section) else {
        return text.to_string();
    };

    let stripped = collapse_blank_lines(&remove_tables(&section.body, |_, t| !is_rendered_table(&t.header)));
    let table = site_overview_table(schema);

    section.body = if table.is_empty() {
        stripped
    } else {
        let (first, rest) = match stripped.split_once("\n\n") {
            Some((first, rest)) => (first, rest),
            None => (stripped.as_str(), ""),
        };
        [first, table.as_str(), rest]
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    doc.render()
}

/// Keep the first site overview table, drop any later copies.
fn dedupe_overview_tables(text: &str) -> String {
    let mut seen = false;
    remove_tables(text, |_, t| {
        if t.header != SITE_OVERVIEW_HEADER {
            return false;
        }
        std::mem::replace(&mut seen, true)
    })
}
