//! Prompt construction.
//!
//! Templates are read once at startup from the prompts directory. A missing
//! file falls back to the built-in text so the service still answers.

use std::path::Path;

use crate::domain::schema::ProjectSchema;

use super::derive::{device_totals_sentence, mounting_qty_from_notes, phase_block_from_notes, primary_site_line, sum_bom_qty};
use super::tables::wave_allocation_table;

const EMAIL_TEXT_TOKEN: &str = "{{EMAIL_TEXT}}";

const INGEST_SYSTEM: &str = "You extract structured project data from delivery notes. \
Return ONE JSON object only, no prose and no code fences.";

const INGEST_CONTENT: &str = r#"Read the project notes below and fill this JSON object. Use "" or null when a value is not stated; never guess.

{
  "client": "", "project_name": "", "service": "", "scope": "", "environment": "", "timeline": "",
  "sites": [{
    "site_id": "", "name": "", "address": "", "country": "", "role": "", "notes": "",
    "constraints": [],
    "bom": [{"type": "", "model": "", "qty": 0, "notes": "", "rack_units": null}],
    "optics_bom": [],
    "tasks": {
      "site_survey": {"include": null, "engineers": null, "days": null, "steps": []},
      "installation": {"include": null, "engineers": null, "days": null, "steps": []},
      "optics_installation": {"include": null, "engineers": null, "days": null, "steps": []},
      "post_install": {"include": null, "engineers": null, "days": null, "steps": []}
    },
    "assumptions": [], "out_of_scope": []
  }],
  "global_scope": {
    "site_survey": {"include": null, "notes": ""},
    "rack_and_stack": {"include": null, "notes": ""},
    "post_install": {"include": null, "notes": ""},
    "optics_installation": {"include": null, "notes": ""}
  },
  "rollout": {"waves": "", "floors": "", "ooh_windows": "", "change_approvals": ""},
  "governance": {"pm": "", "comms_channels": "", "escalation": ""},
  "handover": {"docs": "", "acceptance_criteria": ""},
  "staging": {"ic_used": false, "doa": false, "burn_in": false, "labelling": "", "packing": ""},
  "visits_caps": {"install_max_visits": null, "post_deploy_max_visits": null, "site_survey_window_weeks": null},
  "counts": {"aps_ordered": null, "aps_to_mount": null, "devices_total": null},
  "wave_plan": [{"phase": "", "floor": "", "allocations": [{"model": "", "qty": 0}]}],
  "prerequisites": [], "assumptions": [], "out_of_scope": [], "deliverables": [], "constraints": []
}

NOTES:
{{EMAIL_TEXT}}"#;

const GENERATE_SYSTEM: &str = "You are a delivery engineer writing Level of Effort documents. \
Return JSON only with the keys \"summary\", \"tasks\" and \"open_questions\".";

const GOLDEN: &str = r#"### Project Summary
{{CLIENT}} has engaged WWT to deliver rack & stack services at {{PRIMARY_SITE}}.

- Key tasks overview:
  - Site survey of each location
  - Installation of the equipment listed below
  - Post-installation support

{{BOM_TABLE}}

{{DEVICE_TOTALS_SENTENCE}}

### Project Tasks

### Site Work Packages by Location

#### 📍 <Site name — address>

### Site Survey — Activities Delivered Across Applicable Sites
- (none provided)

### Installation — Activities Delivered Across Applicable Sites
- (none provided)

### Post-Installation — Activities Delivered Across Applicable Sites
- (none provided)

### Client Prerequisites
- (none provided)

### Out of Scope
- (none provided)
"#;

/// Prompt templates shared by every request.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub ingest_system: String,
    pub ingest_content: String,
    pub generate_system: String,
    pub golden: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            ingest_system: INGEST_SYSTEM.to_string(),
            ingest_content: INGEST_CONTENT.to_string(),
            generate_system: GENERATE_SYSTEM.to_string(),
            golden: GOLDEN.to_string(),
        }
    }
}

fn read_or(dir: &Path, name: &str, fallback: &str) -> String {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Prompt template is empty, using built-in");
            fallback.to_string()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Prompt template unavailable, using built-in");
            fallback.to_string()
        }
    }
}

fn bullet_block(items: &[String]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("- {s}"))
        .collect();
    if lines.is_empty() {
        "- (none)".to_string()
    } else {
        lines.join("\n")
    }
}

impl PromptTemplates {
    pub fn load(dir: &Path) -> Self {
        let templates = Self {
            ingest_system: read_or(dir, "ingest_system.txt", INGEST_SYSTEM),
            ingest_content: read_or(dir, "ingest_content.txt", INGEST_CONTENT),
            generate_system: read_or(dir, "generate_system.txt", GENERATE_SYSTEM),
            golden: read_or(dir, "golden.md", GOLDEN),
        };
        tracing::info!(dir = %dir.display(), "Prompt templates loaded");
        templates
    }

    /// Ingest prompt with the notes spliced in.
    pub fn ingest_prompt(&self, text: &str) -> String {
        if self.ingest_content.contains(EMAIL_TEXT_TOKEN) {
            self.ingest_content.replace(EMAIL_TEXT_TOKEN, text)
        } else {
            format!("{}\n\nNOTES:\n{text}", self.ingest_content.trim_end())
        }
    }

    /// Generate prompt: editing rules, schema-derived context, the golden
    /// template and the output contract.
    pub fn generate_prompt(&self, schema: &ProjectSchema) -> String {
        let client = match schema.client.trim() {
            "" => "(Client)",
            c => c,
        };
        let primary_site = primary_site_line(schema).unwrap_or_else(|| "(TBD)".to_string());
        let total_ordered = match sum_bom_qty(schema) {
            0 => "TBD".to_string(),
            n => n.to_string(),
        };
        let mounting = schema
            .counts
            .aps_to_mount
            .filter(|n| *n != 0)
            .map(|n| n.to_string())
            .or_else(|| mounting_qty_from_notes(&schema.notes_raw).map(|n| n.to_string()))
            .unwrap_or_else(|| "TBD".to_string());
        let phase_block = match phase_block_from_notes(&schema.notes_raw) {
            b if b.is_empty() => "(none)".to_string(),
            b => b,
        };
        let waves = match wave_allocation_table(schema) {
            t if t.is_empty() => "(none)".to_string(),
            t => t,
        };

        format!(
            r####"You are a delivery engineer. Start from the GOLDEN TEMPLATE below and make minimal edits:
- Keep the golden headings and order.
- Replace {{{{CLIENT}}}} with the client or '(Client)' and {{{{PRIMARY_SITE}}}} with the primary site line or '(TBD)'.
- Keep {{{{BOM_TABLE}}}} as the exact token; the backend replaces it.
- Replace {{{{DEVICE_TOTALS_SENTENCE}}}} with the exact sentence provided below.
- Preserve all checklist items by default; only remove bullets the context explicitly contradicts.
- Append extra prerequisites or out-of-scope items from the context rather than deleting existing bullets.
- Do NOT invent new sections.

## Context
Client: {client}
Primary site: {primary_site}
Device totals line to use verbatim:
{totals}
Total ordered devices (from BOM): {total_ordered}
Devices to be mounted: {mounting}
Phasing from notes:
{phase_block}
Wave allocations:
{waves}
Client prerequisites (hints):
{prereqs}
Out of scope (hints):
{exclusions}

### GOLDEN TEMPLATE
{golden}

## Output contract
Return JSON ONLY with keys:
  "summary" (string) - begin with "### Project Summary"
  "tasks" (string) - begin with "### Project Tasks"
  "open_questions" (array of strings)"####,
            totals = device_totals_sentence(schema),
            prereqs = bullet_block(&schema.prerequisites),
            exclusions = bullet_block(&schema.out_of_scope),
            golden = self.golden.trim(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{BomRow, Counts, Site};
    use std::io::Write;

    #[test]
    fn ingest_prompt_splices_notes() {
        let t = PromptTemplates::default();
        let prompt = t.ingest_prompt("Rack 4 switches at HQ");
        assert!(prompt.ends_with("NOTES:\nRack 4 switches at HQ"));
        assert!(!prompt.contains(EMAIL_TEXT_TOKEN));
    }

    #[test]
    fn ingest_prompt_appends_when_token_missing() {
        let t = PromptTemplates {
            ingest_content: "Extract.".into(),
            ..PromptTemplates::default()
        };
        assert_eq!(t.ingest_prompt("notes"), "Extract.\n\nNOTES:\nnotes");
    }

    #[test]
    fn generate_prompt_carries_context() {
        let schema = ProjectSchema {
            client: "Acme".into(),
            notes_raw: "120 APs require mounting 120\n\nPhase 1 floors 1-2".into(),
            counts: Counts { aps_ordered: Some(150), ..Counts::default() },
            prerequisites: vec!["Lift access".into()],
            sites: vec![Site {
                name: "HQ".into(),
                bom: vec![BomRow { kind: "AP".into(), model: "AP64".into(), qty: 150, ..BomRow::default() }],
                ..Site::default()
            }],
            ..ProjectSchema::default()
        };
        let prompt = PromptTemplates::default().generate_prompt(&schema);
        assert!(prompt.contains("Client: Acme"));
        assert!(prompt.contains("Primary site: HQ"));
        assert!(prompt.contains("**Device totals:** 150 APs ordered — TBD to be mounted; TBD total devices."));
        assert!(prompt.contains("Total ordered devices (from BOM): 150"));
        assert!(prompt.contains("Devices to be mounted: 120"));
        assert!(prompt.contains("Phasing from notes:\nPhase 1 floors 1-2"));
        assert!(prompt.contains("Client prerequisites (hints):\n- Lift access"));
        assert!(prompt.contains("Out of scope (hints):\n- (none)"));
        assert!(prompt.contains("Keep {{BOM_TABLE}} as the exact token"));
        assert!(prompt.contains("### GOLDEN TEMPLATE\n### Project Summary"));
        assert!(prompt.contains("\"summary\" (string) - begin with \"### Project Summary\""));
        assert!(prompt.ends_with("\"open_questions\" (array of strings)"));
    }

    #[test]
    fn load_reads_directory_with_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("golden.md")).unwrap();
        f.write_all(b"### Custom golden").unwrap();
        std::fs::write(dir.path().join("generate_system.txt"), "   ").unwrap();

        let t = PromptTemplates::load(dir.path());
        assert_eq!(t.golden, "### Custom golden");
        assert_eq!(t.generate_system, GENERATE_SYSTEM);
        assert_eq!(t.ingest_system, INGEST_SYSTEM);
    }
}
