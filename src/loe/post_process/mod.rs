//! Document post-processing.
//!
//! Takes a generator draft and the canonical schema and rewrites the draft
//! into a document with guaranteed sections, substituted tokens and no
//! duplicated tables or sentences. Every step is a no-op when its heading or
//! token is missing, and the whole pass is idempotent.

mod summary;
mod tasks;

use std::sync::LazyLock;

use regex::Regex;

use super::defaults::DocumentDefaults;
use super::markdown::collapse_blank_lines;
use crate::domain::{GeneratedDocument, ProjectSchema};

static CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?P<prefix>[ \t]*[-*•o])[ \t]*\[(?: |x|X)\][ \t]*").expect("valid regex")
});
static ORPHAN_BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]*$").expect("valid regex"));

/// `- [ ] Task` / `* [x] Done` → `- Task` / `* Done`.
pub(crate) fn checkboxes_to_bullets(text: &str) -> String {
    CHECKBOX_RE.replace_all(text, "${prefix} ").into_owned()
}

/// Drop lines holding nothing but `>`.
pub(crate) fn strip_orphan_blockquotes(text: &str) -> String {
    collapse_blank_lines(&ORPHAN_BLOCKQUOTE_RE.replace_all(text, ""))
}

#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    defaults: DocumentDefaults,
}

impl PostProcessor {
    pub fn new(defaults: DocumentDefaults) -> Self {
        Self { defaults }
    }

    /// Run the summary and tasks pipelines over a draft.
    pub fn process(&self, schema: &ProjectSchema, draft: GeneratedDocument) -> GeneratedDocument {
        let summary = summary::process(schema, &draft.summary, &self.defaults);
        let tasks = tasks::process(schema, &draft.tasks, &self.defaults);
        let open_questions = draft
            .open_questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        tracing::debug!(
            summary_len = summary.len(),
            tasks_len = tasks.len(),
            "Post-processed generated document"
        );

        GeneratedDocument {
            summary,
            tasks,
            open_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{BomRow, GlobalScope, PhaseTask, ScopeFlag, Site};
    use crate::loe::tables::{BOM_TABLE_HEADER, SITE_OVERVIEW_HEADER};
    use pretty_assertions::assert_eq;

    fn row(kind: &str, model: &str, qty: u32) -> BomRow {
        BomRow {
            kind: kind.into(),
            model: model.into(),
            qty,
            notes: String::new(),
            rack_units: Some(1),
        }
    }

    fn two_site_schema() -> ProjectSchema {
        let mut a = Site {
            name: "London DC".into(),
            address: "1 Dock Rd".into(),
            bom: vec![row("Switch", "C9300-48P", 4)],
            ..Site::default()
        };
        a.tasks.installation = PhaseTask { include: Some(true), ..PhaseTask::default() };
        a.tasks.site_survey = PhaseTask { include: Some(false), ..PhaseTask::default() };

        let mut b = Site {
            name: "Leeds Office".into(),
            address: "9 Park Sq".into(),
            bom: vec![row("Firewall", "PA-440", 2)],
            ..Site::default()
        };
        b.tasks.installation = PhaseTask { include: Some(true), ..PhaseTask::default() };

        ProjectSchema {
            client: "Acme".into(),
            service: "Rack & Stack".into(),
            sites: vec![a, b],
            global_scope: GlobalScope {
                site_survey: ScopeFlag { include: Some(false), notes: String::new() },
                ..GlobalScope::default()
            },
            ..ProjectSchema::default()
        }
    }

    fn draft(summary: &str, tasks: &str) -> GeneratedDocument {
        GeneratedDocument {
            summary: summary.into(),
            tasks: tasks.into(),
            open_questions: vec!["  Who signs off? ".into(), "".into()],
        }
    }

    #[test]
    fn two_site_scenario() {
        let schema = two_site_schema();
        let out = PostProcessor::default().process(
            &schema,
            draft(
                "### Project Summary\n{{CLIENT}} has engaged WWT at {{PRIMARY_SITE}}.\n\n{{BOM_TABLE}}\n\n{{DEVICE_TOTALS_SENTENCE}}",
                "### Project Tasks\n### Site Survey\n- [ ] Walk the site\n### Installation\n- Rack the switches",
            ),
        );

        let overview_rows: Vec<&str> = out
            .summary
            .lines()
            .filter(|l| l.starts_with("| London DC") || l.starts_with("| Leeds Office"))
            .collect();
        assert_eq!(overview_rows.len(), 2);
        assert_eq!(out.summary.matches(SITE_OVERVIEW_HEADER).count(), 1);
        assert!(out.summary.contains("#### London DC — 1 Dock Rd"));
        assert!(out.summary.contains("#### Leeds Office — 9 Park Sq"));
        assert_eq!(out.summary.matches(BOM_TABLE_HEADER).count(), 2);
        assert!(out.summary.starts_with("### Project Summary\n\nAcme has engaged WWT at London DC — 1 Dock Rd."));

        assert!(!out.tasks.contains("Site Survey"));
        assert!(out.tasks.contains("### Installation — Activities Delivered Across Applicable Sites"));
        assert!(out.tasks.contains("_Applicable sites: London DC — 1 Dock Rd; Leeds Office — 9 Park Sq_"));
        assert!(out.tasks.contains("- Rack the switches"));
        assert_eq!(out.open_questions, vec!["Who signs off?"]);
    }

    #[test]
    fn mirrored_site_scopes_from_raw_notes() {
        let schema = crate::loe::normalize::normalize(&serde_json::json!({
            "client": "Acme",
            "sites": [
                {"name": "A", "survey_in_scope": true, "install_in_scope": false},
                {"name": "B", "survey_in_scope": false, "install_in_scope": true}
            ]
        }));
        let round_trip = crate::loe::normalize::normalize(&serde_json::to_value(&schema).unwrap());
        assert_eq!(round_trip, schema);

        let out = PostProcessor::default().process(&schema, GeneratedDocument::default());
        assert!(out.summary.contains("| A | TBD | TBD | ✔ | ✘ | TBD | TBD |"));
        assert!(out.summary.contains("| B | TBD | TBD | ✘ | ✔ | TBD | TBD |"));

        let tasks = crate::loe::markdown::MarkdownDocument::parse(&out.tasks);
        let install = tasks
            .sections
            .iter()
            .find(|s| s.heading.starts_with("Installation —"))
            .expect("installation section");
        assert!(install.body.contains("_Applicable sites: B_"));
        let survey = tasks
            .sections
            .iter()
            .find(|s| s.heading.starts_with("Site Survey —"))
            .expect("site survey section");
        assert!(survey.body.contains("_Applicable sites: A_"));
    }

    #[test]
    fn processing_twice_is_stable() {
        let schema = two_site_schema();
        let pp = PostProcessor::default();
        let first = pp.process(
            &schema,
            draft(
                "Intro without heading\n\n| Site | x |\n|---|---|\n| a | b |\n\nBOM_TABLE then {BOM_TABLE}\n\n- Key tasks:\n  - [x] Site survey\n  - Installation\n>\n",
                "## Installation\n- Extra step.\n### Out of Scope\nprose line\n- Painting",
            ),
        );
        let second = pp.process(&schema, first.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn empty_draft_gets_required_structure() {
        let out = PostProcessor::default().process(&two_site_schema(), GeneratedDocument::default());
        assert!(out.summary.starts_with("### Project Summary"));
        assert!(out.summary.contains("**Field Engineer is expected to provide"));
        assert!(out.summary.contains("### Bill of Materials by Site"));
        assert_eq!(out.summary.matches("**Device totals:**").count(), 1);
        assert!(out.tasks.contains("### Client Prerequisites"));
        assert!(out.tasks.contains("### Out of Scope"));
        assert!(out.tasks.contains("### Installation —"));
    }

    #[test]
    fn checkboxes_become_bullets() {
        assert_eq!(checkboxes_to_bullets("- [ ] a\n* [x] b\n  - [X] c"), "- a\n* b\n  - c");
    }

    #[test]
    fn orphan_quotes_removed() {
        assert_eq!(strip_orphan_blockquotes("a\n>\n\n> kept\n  >  \nb"), "a\n\n> kept\n\nb");
    }
}
