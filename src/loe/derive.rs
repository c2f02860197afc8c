//! Facts derived from the canonical schema: labels, totals and scope.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::schema::{Phase, ProjectSchema, Site};

static MOUNT_QTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(require\s+mount(?:ing)?|to\s+be\s+mounted)\D+(\d{2,5})").expect("valid regex")
});
static PHASE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(?:core\s*&\s*user|phase\s*\d+)\b").expect("valid regex")
});
static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static INNER_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `Name — Address`, or whichever of the two exists.
fn name_and_address(site: &Site) -> Option<String> {
    match (site.name.trim(), site.address.trim()) {
        ("", "") => None,
        (name, "") => Some(name.to_string()),
        ("", addr) => Some(addr.to_string()),
        (name, addr) => Some(format!("{name} — {addr}")),
    }
}

/// One-line description of the first site that has a name or address.
pub fn primary_site_line(schema: &ProjectSchema) -> Option<String> {
    schema.sites.iter().find_map(name_and_address)
}

/// Human label for a site; `idx` is 1-based.
pub fn site_label(site: &Site, idx: usize) -> String {
    name_and_address(site).unwrap_or_else(|| format!("Site {idx}"))
}

/// Total ordered quantity across site BOMs (optics included).
pub fn sum_bom_qty(schema: &ProjectSchema) -> u64 {
    schema.all_bom_rows().map(|r| u64::from(r.qty)).sum()
}

/// Quantity from phrases like "APs that require mounting 120".
pub fn mounting_qty_from_notes(notes: &str) -> Option<u32> {
    MOUNT_QTY_RE
        .captures(notes)
        .and_then(|caps| caps[2].parse().ok())
}

/// Block of notes starting at a `Core & User` or `Phase N` line and running
/// to the next blank line, whitespace-collapsed.
pub fn phase_block_from_notes(notes: &str) -> String {
    let Some(start) = PHASE_START_RE.find(notes) else {
        return String::new();
    };
    let tail = &notes[start.start()..];
    let chunk = match BLANK_LINE_RE.find(tail) {
        Some(m) => &tail[..m.start()],
        None => tail,
    };
    chunk
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| INNER_WS_RE.replace_all(l, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_tbd(v: Option<i64>) -> String {
    match v {
        Some(n) if n != 0 => n.to_string(),
        _ => "TBD".to_string(),
    }
}

/// The `**Device totals:**` sentence.
pub fn device_totals_sentence(schema: &ProjectSchema) -> String {
    let c = &schema.counts;
    format!(
        "**Device totals:** {} APs ordered — {} to be mounted; {} total devices.",
        or_tbd(c.aps_ordered),
        or_tbd(c.aps_to_mount),
        or_tbd(c.devices_total)
    )
}

/// Whether a phase belongs in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseGate {
    /// Some scope says the phase is in.
    Included,
    /// Nothing says either way.
    Unknown,
    /// Nothing says in, and at least one scope says out.
    Excluded,
}

pub fn phase_gate(schema: &ProjectSchema, phase: Phase) -> PhaseGate {
    let flags: Vec<Option<bool>> = std::iter::once(schema.global_scope.get(phase).include)
        .chain(schema.sites.iter().map(|s| s.includes(phase)))
        .collect();

    if flags.contains(&Some(true)) {
        PhaseGate::Included
    } else if flags.contains(&Some(false)) {
        PhaseGate::Excluded
    } else {
        PhaseGate::Unknown
    }
}

/// Labels of sites whose own scope includes the phase.
pub fn sites_including(schema: &ProjectSchema, phase: Phase) -> Vec<String> {
    schema
        .sites
        .iter()
        .enumerate()
        .filter(|(_, s)| s.includes(phase) == Some(true))
        .map(|(i, s)| site_label(s, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{BomRow, Counts, PhaseTask, ScopeFlag};

    fn site(name: &str, address: &str) -> Site {
        Site {
            name: name.into(),
            address: address.into(),
            ..Site::default()
        }
    }

    #[test]
    fn primary_site_prefers_name_and_address() {
        let schema = ProjectSchema {
            sites: vec![site("", ""), site("HQ", "1 Main St")],
            ..ProjectSchema::default()
        };
        assert_eq!(primary_site_line(&schema).as_deref(), Some("HQ — 1 Main St"));
        assert_eq!(primary_site_line(&ProjectSchema::default()), None);
    }

    #[test]
    fn site_label_falls_back_to_index() {
        assert_eq!(site_label(&site("", ""), 3), "Site 3");
        assert_eq!(site_label(&site("", "2 High St"), 1), "2 High St");
    }

    #[test]
    fn sums_all_site_rows() {
        let row = |qty| BomRow { kind: "Switch".into(), qty, ..BomRow::default() };
        let schema = ProjectSchema {
            sites: vec![Site {
                bom: vec![row(2), row(3)],
                optics_bom: vec![row(4)],
                ..Site::default()
            }],
            ..ProjectSchema::default()
        };
        assert_eq!(sum_bom_qty(&schema), 9);
    }

    #[test]
    fn mounting_qty_is_read_from_notes() {
        assert_eq!(mounting_qty_from_notes("There are 200 APs, 120 require mounting 120 on ceilings"), Some(120));
        assert_eq!(mounting_qty_from_notes("APs to be mounted: 45"), Some(45));
        assert_eq!(mounting_qty_from_notes("nothing here"), None);
    }

    #[test]
    fn phase_block_stops_at_blank_line() {
        let notes = "Intro\nPhase 1   floors 1-3\n  Phase 2 floors 4-6\n\nUnrelated";
        assert_eq!(phase_block_from_notes(notes), "Phase 1 floors 1-3\nPhase 2 floors 4-6");
        assert_eq!(phase_block_from_notes("no phases"), "");
    }

    #[test]
    fn device_totals_uses_tbd_for_unknowns() {
        let schema = ProjectSchema {
            counts: Counts { aps_ordered: Some(10), aps_to_mount: None, devices_total: Some(14) },
            ..ProjectSchema::default()
        };
        assert_eq!(
            device_totals_sentence(&schema),
            "**Device totals:** 10 APs ordered — TBD to be mounted; 14 total devices."
        );
    }

    #[test]
    fn gate_follows_any_true_then_any_false() {
        let mut schema = ProjectSchema::default();
        assert_eq!(phase_gate(&schema, Phase::SiteSurvey), PhaseGate::Unknown);

        schema.global_scope.site_survey = ScopeFlag { include: Some(false), notes: String::new() };
        assert_eq!(phase_gate(&schema, Phase::SiteSurvey), PhaseGate::Excluded);

        let mut s = site("A", "");
        s.tasks.site_survey = PhaseTask { include: Some(true), ..PhaseTask::default() };
        schema.sites.push(s);
        assert_eq!(phase_gate(&schema, Phase::SiteSurvey), PhaseGate::Included);
    }

    #[test]
    fn legacy_flag_counts_for_site_scope() {
        let mut s = site("B", "");
        s.post_in_scope = Some(true);
        let schema = ProjectSchema { sites: vec![s], ..ProjectSchema::default() };
        assert_eq!(phase_gate(&schema, Phase::PostInstall), PhaseGate::Included);
        assert_eq!(sites_including(&schema, Phase::PostInstall), vec!["B"]);
    }
}
