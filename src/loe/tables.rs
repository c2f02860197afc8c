//! Markdown table builders.
//!
//! Pure functions of the schema. Each returns an empty string when nothing
//! qualifies, so callers can tell "no data" from "has data".

use std::collections::HashSet;

use super::derive::site_label;
use crate::domain::schema::{BomRow, Phase, ProjectSchema, Site};

/// Header line of the BOM table (with rack units).
pub const BOM_TABLE_HEADER: &str = "| Part Number | Description | Qty | Type | Rack Unit |";

/// Header line of the site overview table; also its dedupe signature.
pub const SITE_OVERVIEW_HEADER: &str =
    "| Site | Address | Site Role | Site Survey | Installation | Post-Installation | Notes |";

const INCLUDED: &str = "✔";
const EXCLUDED: &str = "✘";
const UNKNOWN: &str = "TBD";

/// Table cells cannot carry pipes or newlines.
fn cell(s: &str) -> String {
    s.trim().replace('|', "/").replace(['\r', '\n'], " ")
}

fn or_dash(s: &str) -> String {
    let s = cell(s);
    if s.is_empty() {
        "-".to_string()
    } else {
        s
    }
}

fn qualifies(row: &BomRow) -> bool {
    (!row.model.trim().is_empty() || !row.kind.trim().is_empty()) && row.qty > 0
}

/// BOM table for a set of rows: `Part Number | Description | Qty | Type`
/// plus `Rack Unit` when asked.
pub fn bom_table<'a>(rows: impl IntoIterator<Item = &'a BomRow>, include_rack_unit: bool) -> String {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for row in rows.into_iter().filter(|r| qualifies(r)) {
        let key = (
            row.model.trim().to_lowercase(),
            row.notes.trim().to_lowercase(),
            row.qty,
            row.kind.trim().to_lowercase(),
            row.rack_units,
        );
        if !seen.insert(key) {
            continue;
        }

        let ru = row
            .rack_units
            .map(|ru| ru.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut line = format!(
            "| {} | {} | {} | {} |",
            or_dash(&row.model),
            or_dash(&row.notes),
            row.qty,
            or_dash(&row.kind)
        );
        if include_rack_unit {
            line.push_str(&format!(" {ru} |"));
        }
        lines.push(line);
    }

    if lines.is_empty() {
        return String::new();
    }

    let header = if include_rack_unit {
        format!("{BOM_TABLE_HEADER}\n| --- | --- | :---: | --- | --- |")
    } else {
        "| Part Number | Description | Qty | Type |\n| --- | --- | :---: | --- |".to_string()
    };
    format!("{header}\n{}", lines.join("\n"))
}

/// One `#### <site>` block with a BOM table per site that has qualifying
/// rows (BOM and optics together).
pub fn multi_site_bom(schema: &ProjectSchema) -> String {
    schema
        .sites
        .iter()
        .enumerate()
        .filter_map(|(i, site)| {
            let table = bom_table(site.bom.iter().chain(site.optics_bom.iter()), true);
            (!table.is_empty()).then(|| format!("#### {}\n\n{table}", site_label(site, i + 1)))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wave allocation matrix: one row per wave, one column per model.
pub fn wave_allocation_table(schema: &ProjectSchema) -> String {
    let mut models: Vec<String> = Vec::new();
    let mut waves: Vec<(String, Vec<(usize, u64)>)> = Vec::new();

    for (i, wave) in schema.wave_plan.iter().enumerate() {
        let mut cells: Vec<(usize, u64)> = Vec::new();
        for alloc in wave
            .allocations
            .iter()
            .filter(|a| !a.model.trim().is_empty() && a.qty > 0)
        {
            let model = cell(&alloc.model);
            let col = match models.iter().position(|m| m.eq_ignore_ascii_case(&model)) {
                Some(col) => col,
                None => {
                    models.push(model);
                    models.len() - 1
                }
            };
            match cells.iter_mut().find(|(c, _)| *c == col) {
                Some((_, qty)) => *qty += u64::from(alloc.qty),
                None => cells.push((col, u64::from(alloc.qty))),
            }
        }
        if cells.is_empty() {
            continue;
        }

        let label = match (cell(&wave.phase).as_str(), cell(&wave.floor).as_str()) {
            ("", "") => format!("Wave {}", i + 1),
            (phase, "") => phase.to_string(),
            ("", floor) => floor.to_string(),
            (phase, floor) => format!("{phase} / {floor}"),
        };
        waves.push((label, cells));
    }

    if waves.is_empty() {
        return String::new();
    }

    let mut out = format!("| Wave | {} | Total |\n", models.join(" | "));
    out.push_str(&format!("| --- |{} :---: |", " :---: |".repeat(models.len())));

    for (label, cells) in &waves {
        let row: Vec<String> = (0..models.len())
            .map(|col| {
                cells
                    .iter()
                    .find(|(c, _)| *c == col)
                    .map(|(_, q)| q.to_string())
                    .unwrap_or_else(|| "-".to_string())
            })
            .collect();
        let total: u64 = cells.iter().map(|(_, q)| q).sum();
        out.push_str(&format!("\n| {label} | {} | {total} |", row.join(" | ")));
    }

    out
}

/// Inclusion glyph: task flag, then legacy flat flag, then `TBD`.
fn phase_glyph(site: &Site, phase: Phase) -> &'static str {
    match site.includes(phase) {
        Some(true) => INCLUDED,
        Some(false) => EXCLUDED,
        None => UNKNOWN,
    }
}

/// Site overview matrix for the Project Summary.
pub fn site_overview_table(schema: &ProjectSchema) -> String {
    if schema.sites.is_empty() {
        return String::new();
    }

    let or_tbd = |s: &str| {
        let s = cell(s);
        if s.is_empty() {
            UNKNOWN.to_string()
        } else {
            s
        }
    };

    let mut out = format!(
        "{SITE_OVERVIEW_HEADER}\n|------|---------|-----------|-------------|--------------|-------------------|-------|"
    );
    for (i, site) in schema.sites.iter().enumerate() {
        let name = match cell(&site.name) {
            n if n.is_empty() => format!("Site {}", i + 1),
            n => n,
        };
        out.push_str(&format!(
            "\n| {name} | {} | {} | {} | {} | {} | {} |",
            or_tbd(&site.address),
            or_tbd(&site.role),
            phase_glyph(site, Phase::SiteSurvey),
            phase_glyph(site, Phase::Installation),
            phase_glyph(site, Phase::PostInstall),
            or_tbd(&site.notes),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{Allocation, PhaseTask, WavePlanEntry};
    use pretty_assertions::assert_eq;

    fn row(kind: &str, model: &str, qty: u32) -> BomRow {
        BomRow {
            kind: kind.into(),
            model: model.into(),
            qty,
            notes: String::new(),
            rack_units: None,
        }
    }

    #[test]
    fn bom_table_skips_empty_and_zero_rows() {
        let rows = vec![
            row("Switch", "C9300", 2),
            row("Switch", "C9300-ZERO", 0),
            row("", "", 5),
        ];
        let table = bom_table(&rows, true);
        assert!(table.contains("| C9300 | - | 2 | Switch | - |"));
        assert!(!table.contains("C9300-ZERO"));
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn bom_table_suppresses_duplicates() {
        let rows = vec![row("Switch", "C9300", 2), row("switch", "c9300", 2), row("Switch", "C9300", 3)];
        let table = bom_table(&rows, false);
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn bom_table_empty_when_nothing_qualifies() {
        assert_eq!(bom_table(&[row("Switch", "X", 0)], true), "");
    }

    #[test]
    fn multi_site_bom_labels_each_site() {
        let schema = ProjectSchema {
            sites: vec![
                Site { name: "HQ".into(), address: "1 Main St".into(), bom: vec![row("Switch", "C9300", 1)], ..Site::default() },
                Site { name: "Empty".into(), bom: vec![row("Switch", "C9300", 0)], ..Site::default() },
                Site { optics_bom: vec![row("SFP", "SFP-10G-SR", 4)], ..Site::default() },
            ],
            ..ProjectSchema::default()
        };
        let md = multi_site_bom(&schema);
        assert!(md.starts_with("#### HQ — 1 Main St\n\n| Part Number"));
        assert!(md.contains("#### Site 3"));
        assert!(!md.contains("Empty"));
        assert_eq!(md.matches(BOM_TABLE_HEADER).count(), 2);
    }

    #[test]
    fn wave_table_builds_matrix() {
        let schema = ProjectSchema {
            wave_plan: vec![
                WavePlanEntry {
                    phase: "Wave 1".into(),
                    floor: "Floors 1-2".into(),
                    allocations: vec![
                        Allocation { model: "AP64".into(), qty: 10 },
                        Allocation { model: "AP45".into(), qty: 2 },
                        Allocation { model: "ap64".into(), qty: 1 },
                    ],
                },
                WavePlanEntry {
                    phase: "".into(),
                    floor: "".into(),
                    allocations: vec![Allocation { model: "".into(), qty: 3 }, Allocation { model: "AP45".into(), qty: 0 }],
                },
                WavePlanEntry {
                    phase: "".into(),
                    floor: "Floor 3".into(),
                    allocations: vec![Allocation { model: "AP45".into(), qty: 5 }],
                },
            ],
            ..ProjectSchema::default()
        };
        let expected = "| Wave | AP64 | AP45 | Total |\n\
                        | --- | :---: | :---: | :---: |\n\
                        | Wave 1 / Floors 1-2 | 11 | 2 | 13 |\n\
                        | Floor 3 | - | 5 | 5 |";
        assert_eq!(wave_allocation_table(&schema), expected);
    }

    #[test]
    fn wave_table_empty_without_allocations() {
        let schema = ProjectSchema {
            wave_plan: vec![WavePlanEntry::default()],
            ..ProjectSchema::default()
        };
        assert_eq!(wave_allocation_table(&schema), "");
    }

    #[test]
    fn overview_glyphs_follow_task_then_legacy_flags() {
        let mut a = Site { name: "A".into(), survey_in_scope: Some(true), install_in_scope: Some(false), ..Site::default() };
        a.tasks.site_survey = PhaseTask { include: Some(true), ..PhaseTask::default() };
        a.tasks.installation = PhaseTask { include: Some(false), ..PhaseTask::default() };
        let b = Site { address: "2 High St".into(), survey_in_scope: Some(false), install_in_scope: Some(true), ..Site::default() };
        let schema = ProjectSchema { sites: vec![a, b], ..ProjectSchema::default() };

        let table = site_overview_table(&schema);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], SITE_OVERVIEW_HEADER);
        assert_eq!(lines[2], "| A | TBD | TBD | ✔ | ✘ | TBD | TBD |");
        assert_eq!(lines[3], "| Site 2 | 2 High St | TBD | ✘ | ✔ | TBD | TBD |");
    }

    #[test]
    fn overview_empty_without_sites() {
        assert_eq!(site_overview_table(&ProjectSchema::default()), "");
    }
}
