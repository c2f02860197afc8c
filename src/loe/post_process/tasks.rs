//! Project Tasks pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::{checkboxes_to_bullets, strip_orphan_blockquotes};
use crate::domain::schema::{Phase, ProjectSchema};
use crate::loe::defaults::DocumentDefaults;
use crate::loe::derive::{phase_gate, sites_including, PhaseGate};
use crate::loe::markdown::{collapse_blank_lines, fold_heading, MarkdownDocument, Section};

static LEADING_TASKS_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A\s*(?:#{1,6}[ \t]*)?Project Tasks[ \t]*:?[ \t]*#*[ \t]*(?:\n|\z)").expect("valid regex")
});
static SHALLOW_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,2}[ \t]+").expect("valid regex"));
static VAGUE_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*[-*][ \t]*(?:Site-specific tasks TBD|\(none provided\))\.?[ \t]*$\n?")
        .expect("valid regex")
});
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?:[-*•]|\d{1,2}[.)])[ \t]+(?P<text>\S.*)$").expect("valid regex")
});

const SITE_CARD_MARKER: &str = "📍";

/// Recognized `###` sections of the tasks document, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SectionKind {
    SiteWorkPackages,
    SiteSurvey,
    Installation,
    OpticsInstallation,
    PostInstallation,
    ClientPrerequisites,
    OutOfScope,
}

impl SectionKind {
    const ORDER: [SectionKind; 7] = [
        SectionKind::SiteWorkPackages,
        SectionKind::SiteSurvey,
        SectionKind::Installation,
        SectionKind::OpticsInstallation,
        SectionKind::PostInstallation,
        SectionKind::ClientPrerequisites,
        SectionKind::OutOfScope,
    ];

    fn classify(heading: &str) -> Option<Self> {
        let h = fold_heading(heading);
        let has = |needle: &str| h.contains(needle);

        if has("work package") {
            Some(Self::SiteWorkPackages)
        } else if has("prerequisite") {
            Some(Self::ClientPrerequisites)
        } else if has("out of scope") {
            Some(Self::OutOfScope)
        } else if has("post install") || has("post deploy") {
            Some(Self::PostInstallation)
        } else if has("optic") {
            Some(Self::OpticsInstallation)
        } else if has("survey") {
            Some(Self::SiteSurvey)
        } else if has("install") || has("rack & stack") || has("rack and stack") {
            Some(Self::Installation)
        } else {
            None
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::SiteWorkPackages => "Site Work Packages by Location",
            Self::SiteSurvey => "Site Survey — Activities Delivered Across Applicable Sites",
            Self::Installation => "Installation — Activities Delivered Across Applicable Sites",
            Self::OpticsInstallation => "Optics Installation — Activities Delivered Across Applicable Sites",
            Self::PostInstallation => "Post-Installation — Activities Delivered Across Applicable Sites",
            Self::ClientPrerequisites => "Client Prerequisites",
            Self::OutOfScope => "Out of Scope",
        }
    }

    fn rank(self) -> usize {
        Self::ORDER.iter().position(|k| *k == self).unwrap_or(Self::ORDER.len())
    }

    fn phase(self) -> Option<Phase> {
        match self {
            Self::SiteSurvey => Some(Phase::SiteSurvey),
            Self::Installation => Some(Phase::Installation),
            Self::OpticsInstallation => Some(Phase::OpticsInstallation),
            Self::PostInstallation => Some(Phase::PostInstall),
            _ => None,
        }
    }

    /// Whether the section must exist even if the draft omits it.
    fn required(self, schema: &ProjectSchema) -> bool {
        match self {
            Self::ClientPrerequisites | Self::OutOfScope => true,
            Self::SiteWorkPackages => false,
            phase => phase
                .phase()
                .is_some_and(|p| phase_gate(schema, p) == PhaseGate::Included),
        }
    }

    fn excluded(self, schema: &ProjectSchema) -> bool {
        self.phase()
            .is_some_and(|p| phase_gate(schema, p) == PhaseGate::Excluded)
    }
}

pub(super) fn process(schema: &ProjectSchema, draft: &str, defaults: &DocumentDefaults) -> String {
    let text = checkboxes_to_bullets(draft.trim());
    let text = LEADING_TASKS_HEADING_RE.replace(&text, "");
    let text = SHALLOW_HEADING_RE.replace_all(&text, "### ");
    let text = VAGUE_BULLET_RE.replace_all(&text, "");
    // Before parsing, so a card holding only `>` counts as empty.
    let text = strip_orphan_blockquotes(&text);

    let mut doc = MarkdownDocument::parse(&text);
    merge_sections(&mut doc, schema, defaults);
    fill_site_cards(&mut doc, schema, defaults);

    collapse_blank_lines(&doc.render())
}

/// A bullet line split into its indentation and text.
fn parse_bullet(line: &str) -> Option<(&str, &str)> {
    let caps = BULLET_RE.captures(line.trim_end())?;
    let indent = caps.name("indent")?.as_str();
    let text = caps.name("text")?.as_str();
    Some((if indent.is_empty() { "" } else { "  " }, text))
}

/// Comparison key: case, marker and trailing punctuation insensitive.
fn bullet_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ';', ':', ',', '!'])
        .to_lowercase()
}

fn model_bullets(body: &str) -> Vec<(String, String)> {
    body.lines()
        .filter_map(parse_bullet)
        .map(|(indent, text)| (indent.to_string(), text.to_string()))
        .collect()
}

/// Default lines as `(indent, text)` pairs; plain lines become bullets.
fn as_items(lines: &[String]) -> Vec<(String, String)> {
    lines
        .iter()
        .filter_map(|l| match parse_bullet(l) {
            Some((indent, text)) => Some((indent.to_string(), text.to_string())),
            None if l.trim().is_empty() => None,
            None => Some((String::new(), l.trim().to_string())),
        })
        .collect()
}

fn default_bullets(kind: SectionKind, schema: &ProjectSchema, defaults: &DocumentDefaults) -> Vec<(String, String)> {
    match kind {
        SectionKind::ClientPrerequisites => {
            let mut items = as_items(&defaults.prerequisites);
            items.extend(as_items(&schema.prerequisites));
            items
        }
        SectionKind::OutOfScope => {
            let mut items = as_items(&defaults.out_of_scope);
            items.extend(as_items(&schema.out_of_scope));
            items
        }
        other => other
            .phase()
            .map(|p| as_items(defaults.phase_bullets(p)))
            .unwrap_or_default(),
    }
}

/// Defaults first, then model bullets not already present.
fn merged_body(
    kind: SectionKind,
    extra: &[(String, String)],
    schema: &ProjectSchema,
    defaults: &DocumentDefaults,
) -> String {
    let mut lines = Vec::new();

    if let Some(phase) = kind.phase() {
        let sites = sites_including(schema, phase);
        if !sites.is_empty() {
            lines.push(format!("_Applicable sites: {}_", sites.join("; ")));
            lines.push(String::new());
        }
    }

    let mut seen = HashSet::new();
    for (indent, text) in default_bullets(kind, schema, defaults).iter().chain(extra) {
        if seen.insert(bullet_key(text)) {
            lines.push(format!("{indent}- {text}"));
        }
    }

    lines.join("\n")
}

/// Gate, merge, rename and complete the recognized sections.
fn merge_sections(doc: &mut MarkdownDocument, schema: &ProjectSchema, defaults: &DocumentDefaults) {
    let mut kept: Vec<(Option<SectionKind>, Section)> = Vec::new();
    let mut bullets: HashMap<SectionKind, Vec<(String, String)>> = HashMap::new();

    for section in doc.sections.drain(..) {
        let Some(kind) = SectionKind::classify(&section.heading) else {
            kept.push((None, section));
            continue;
        };
        if kind.excluded(schema) {
            tracing::debug!(heading = %section.heading, "Dropping out-of-scope phase section");
            continue;
        }

        let existing = kept.iter().position(|(k, _)| *k == Some(kind));
        if kind == SectionKind::SiteWorkPackages {
            match existing {
                Some(i) => {
                    let merged = format!("{}\n\n{}", kept[i].1.body, section.body);
                    kept[i].1 = Section::new(kind.heading(), merged);
                }
                None => kept.push((Some(kind), Section::new(kind.heading(), section.body))),
            }
            continue;
        }

        bullets
            .entry(kind)
            .or_default()
            .extend(model_bullets(&section.body));
        if existing.is_none() {
            kept.push((Some(kind), Section::new(kind.heading(), "")));
        }
    }

    for kind in SectionKind::ORDER {
        if kept.iter().any(|(k, _)| *k == Some(kind)) || !kind.required(schema) {
            continue;
        }
        let at = kept
            .iter()
            .position(|(k, _)| k.is_some_and(|k| k.rank() > kind.rank()))
            .unwrap_or(kept.len());
        kept.insert(at, (Some(kind), Section::new(kind.heading(), "")));
    }

    for (kind, section) in &mut kept {
        let Some(kind) = *kind else { continue };
        if kind == SectionKind::SiteWorkPackages {
            continue;
        }
        let extra = bullets.get(&kind).map(Vec::as_slice).unwrap_or_default();
        section.body = merged_body(kind, extra, schema, defaults);
    }

    doc.sections = kept.into_iter().map(|(_, s)| s).collect();
}

fn card_phases(schema: &ProjectSchema, idx: usize) -> Vec<&'static str> {
    let Some(site) = schema.sites.get(idx) else {
        return Vec::new();
    };
    [
        (Phase::SiteSurvey, "site survey"),
        (Phase::Installation, "installation"),
        (Phase::PostInstall, "post-installation support"),
    ]
    .into_iter()
    .filter(|(phase, _)| site.includes(*phase) == Some(true))
    .map(|(_, name)| name)
    .collect()
}

/// Give empty `#### 📍` site cards a default body.
fn fill_site_cards(doc: &mut MarkdownDocument, schema: &ProjectSchema, defaults: &DocumentDefaults) {
    let Some(section) = doc.find_mut(|s| s.heading == SectionKind::SiteWorkPackages.heading()) else {
        return;
    };

    let mut cards = MarkdownDocument::parse_at(&section.body, 4);
    let mut idx = 0;
    for card in cards
        .sections
        .iter_mut()
        .filter(|c| c.heading.starts_with(SITE_CARD_MARKER))
    {
        if card.body.trim().is_empty() {
            card.body = defaults.site_card_body(&card_phases(schema, idx));
        }
        idx += 1;
    }
    section.body = cards.render();
}
