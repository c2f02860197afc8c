//! Schema normalization.
//!
//! `normalize` turns whatever the extraction model produced into a
//! [`ProjectSchema`]. Every structured field goes through a discriminated
//! reshape: a mapping contributes its recognized keys, a scalar lands in the
//! one sub-key it most plausibly describes, anything else yields defaults.
//! Nothing here returns an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::coerce::{
    slugify, stringify_mapping, to_array, to_bool, to_bool_opt, to_float_opt, to_int, to_int_opt,
    to_qty, trim, trim_opt, truncate_chars, truthy,
};
use crate::domain::schema::{
    Allocation, BomRow, Counts, EffortSummary, EffortTotals, GlobalScope, Governance, Handover,
    Phase, PhaseScope, PhaseTask, ProjectSchema, Rollout, ScopeFlag, Site, Staging, VisitsCaps,
    WavePlanEntry,
};

/// Raw notes are capped to keep prompts bounded.
pub const NOTES_RAW_MAX_CHARS: usize = 3000;

/// Rack-unit values outside this range are treated as noise.
pub const PLAUSIBLE_RACK_UNITS: std::ops::Range<u32> = 1..50;

static QTY_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bx\s*(\d+)\b").expect("valid regex"));

/// Shape of a raw value, used to pick a reshape rule.
enum Shape<'a> {
    Mapping(&'a Map<String, Value>),
    Scalar(&'a Value),
    Other,
}

fn shape(v: Option<&Value>) -> Shape<'_> {
    match v {
        Some(Value::Object(map)) => Shape::Mapping(map),
        Some(v @ (Value::String(_) | Value::Bool(_) | Value::Number(_))) => Shape::Scalar(v),
        _ => Shape::Other,
    }
}

/// Normalize an arbitrary JSON value into the canonical schema.
pub fn normalize(raw: &Value) -> ProjectSchema {
    let Value::Object(s) = raw else {
        tracing::debug!("Non-object schema input, substituting empty schema");
        return ProjectSchema::default();
    };

    let mut sites: Vec<Site> = match s.get("sites") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(site) if has_identity(site) => Some(coerce_site(site)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    fold_legacy_rows(s, &mut sites);

    let mut counts = coerce_counts(s.get("counts"));
    if counts.devices_total.unwrap_or(0) == 0 {
        if let Some(total) = devices_from_sites(&sites) {
            counts.devices_total = Some(total);
        }
    }

    let effort_summary = derive_effort(s.get("effort_summary"), &sites);

    let schema = ProjectSchema {
        loe_type: trim_opt(s.get("loe_type")),
        client: trim_opt(s.get("client")),
        project_name: trim_opt(s.get("project_name")),
        service: trim_opt(s.get("service")),
        scope: trim_opt(s.get("scope")),
        environment: trim_opt(s.get("environment")),
        timeline: s.get("timeline").map(stringify_mapping).unwrap_or_default(),
        notes_raw: truncate_chars(&trim_opt(s.get("notes_raw")), NOTES_RAW_MAX_CHARS)
            .trim_end()
            .to_string(),
        global_scope: coerce_global_scope(s.get("global_scope")),
        bom: Vec::new(),
        rollout: coerce_rollout(s.get("rollout")),
        governance: coerce_governance(s.get("governance")),
        handover: coerce_handover(s.get("handover")),
        staging: coerce_staging(s.get("staging")),
        visits_caps: coerce_visits_caps(s.get("visits_caps")),
        counts,
        wave_plan: coerce_wave_plan(s.get("wave_plan")),
        effort_summary,
        prerequisites: list_field(s, "prerequisites"),
        assumptions: list_field(s, "assumptions"),
        out_of_scope: list_field(s, "out_of_scope"),
        deliverables: list_field(s, "deliverables"),
        constraints: list_field(s, "constraints"),
        sites,
    };

    tracing::debug!(
        sites = schema.sites.len(),
        bom_rows = schema.all_bom_rows().count(),
        "Schema normalized"
    );

    schema
}

fn list_field(s: &Map<String, Value>, key: &str) -> Vec<String> {
    s.get(key).map(to_array).unwrap_or_default()
}

// -------- sites --------------------------------------------------------------

fn non_empty_list(v: Option<&Value>) -> bool {
    matches!(v, Some(Value::Array(a)) if !a.is_empty())
}

/// A site entry is kept when it names a place or carries equipment.
fn has_identity(site: &Map<String, Value>) -> bool {
    ["site_id", "name", "address", "country"]
        .iter()
        .any(|k| !trim_opt(site.get(*k)).is_empty())
        || non_empty_list(site.get("bom"))
        || non_empty_list(site.get("optics_bom"))
}

fn coerce_site(s: &Map<String, Value>) -> Site {
    let mut site = Site {
        site_id: trim_opt(s.get("site_id")),
        name: trim_opt(s.get("name")),
        address: trim_opt(s.get("address")),
        country: trim_opt(s.get("country")),
        role: trim_opt(s.get("role")),
        notes: trim_opt(s.get("notes")),
        constraints: list_field(s, "constraints"),
        bom: coerce_bom(s.get("bom")),
        optics_bom: coerce_bom(s.get("optics_bom")),
        assumptions: list_field(s, "assumptions"),
        out_of_scope: list_field(s, "out_of_scope"),
        survey_in_scope: to_bool_opt(s.get("survey_in_scope")),
        install_in_scope: to_bool_opt(s.get("install_in_scope")),
        post_in_scope: to_bool_opt(s.get("post_in_scope")),
        tasks: PhaseScope::default(),
    };
    site.tasks = coerce_tasks(s.get("tasks"), &site);

    if site.site_id.is_empty() {
        let base = [&site.name, &site.address, &site.country]
            .into_iter()
            .find(|v| !v.is_empty())
            .map(String::as_str)
            .unwrap_or("site");
        site.site_id = slugify(base);
        if site.site_id.is_empty() {
            site.site_id = "site".to_string();
        }
    }

    site
}

/// Per-site phase scope. Unknown inclusion is seeded from the legacy flat
/// flag; installation is assumed in scope when nothing says otherwise.
fn coerce_tasks(raw: Option<&Value>, site: &Site) -> PhaseScope {
    let empty = Map::new();
    let t = match raw {
        Some(Value::Object(map)) => map,
        _ => &empty,
    };

    let mut scope = PhaseScope::default();
    for phase in Phase::ALL {
        let mut task = match shape(t.get(phase.task_key())) {
            Shape::Mapping(m) => PhaseTask {
                include: to_bool_opt(m.get("include")),
                engineers: to_int_opt(m.get("engineers")),
                days: to_float_opt(m.get("days")),
                steps: list_field(m, "steps"),
            },
            Shape::Scalar(v) => PhaseTask {
                include: to_bool(v),
                ..PhaseTask::default()
            },
            Shape::Other => PhaseTask::default(),
        };

        if task.include.is_none() {
            task.include = site.legacy_flag(phase);
        }
        if task.include.is_none() && phase == Phase::Installation {
            task.include = Some(true);
        }

        *scope.get_mut(phase) = task;
    }
    scope
}

// -------- BOM ----------------------------------------------------------------

fn coerce_bom(raw: Option<&Value>) -> Vec<BomRow> {
    match raw {
        Some(Value::Array(rows)) => rows.iter().filter_map(coerce_bom_row).collect(),
        _ => Vec::new(),
    }
}

/// Object rows are coerced field by field; `"Server x8"` style strings are
/// reshaped into a typed row. Other shapes carry no usable data.
fn coerce_bom_row(v: &Value) -> Option<BomRow> {
    match v {
        Value::Object(r) => {
            let model = trim_opt(r.get("model"));
            let mut kind = trim_opt(r.get("type"));
            if kind.is_empty() && !model.is_empty() {
                kind = "Device".to_string();
            }
            Some(BomRow {
                kind,
                model,
                qty: to_qty(r.get("qty")),
                notes: trim_opt(r.get("notes")),
                rack_units: existing_rack_units(r),
            })
        }
        Value::String(s) => parse_device_line(s),
        _ => None,
    }
}

fn existing_rack_units(r: &Map<String, Value>) -> Option<u32> {
    ["rack_units", "rack_unit", "ru"]
        .iter()
        .filter_map(|k| r.get(*k).and_then(to_int))
        .find_map(|n| u32::try_from(n).ok().filter(|n| PLAUSIBLE_RACK_UNITS.contains(n)))
}

/// `"Switch x4"` → `{type: Switch, qty: 4}`; a bare label gets qty 0.
fn parse_device_line(s: &str) -> Option<BomRow> {
    let s = s.trim();
    let (kind, qty) = match QTY_SUFFIX_RE.captures(s) {
        Some(caps) => {
            let qty = caps[1].parse::<u32>().unwrap_or(0);
            let kind = QTY_SUFFIX_RE.replace(s, "").trim().to_string();
            (kind, qty)
        }
        None => (s.to_string(), 0),
    };
    if kind.is_empty() && qty == 0 {
        return None;
    }
    Some(BomRow {
        kind: if kind.is_empty() { "Device".to_string() } else { kind },
        qty,
        ..BomRow::default()
    })
}

/// Legacy top-level `bom`/`devices` rows move into the first site so that
/// tables, which only read sites, still show them.
fn fold_legacy_rows(s: &Map<String, Value>, sites: &mut [Site]) {
    let mut legacy = coerce_bom(s.get("bom"));
    legacy.extend(coerce_bom(s.get("devices")));
    if legacy.is_empty() {
        return;
    }

    match sites.first_mut() {
        Some(first) => {
            tracing::debug!(rows = legacy.len(), site = %first.site_id, "Folding legacy BOM rows into first site");
            first.bom.extend(legacy);
        }
        None => {
            tracing::warn!(rows = legacy.len(), "Dropping legacy BOM rows: schema has no sites");
        }
    }
}

/// Device count from site BOMs; optics rows are not devices.
fn devices_from_sites(sites: &[Site]) -> Option<i64> {
    let total: i64 = sites
        .iter()
        .flat_map(|s| s.bom.iter())
        .filter(|r| !r.kind.to_lowercase().contains("optic"))
        .map(|r| i64::from(r.qty))
        .sum();
    (total > 0).then_some(total)
}

fn derive_effort(raw: Option<&Value>, sites: &[Site]) -> EffortSummary {
    let supplied = match raw {
        Some(Value::Object(es)) => match es.get("totals") {
            Some(Value::Object(t)) => to_float_opt(t.get("engineer_days")),
            _ => None,
        },
        _ => None,
    };

    let derived: f64 = sites
        .iter()
        .filter_map(|s| {
            let inst = &s.tasks.installation;
            Some(inst.engineers? as f64 * inst.days?)
        })
        .sum();

    let derived = Some((derived * 100.0).round() / 100.0).filter(|d| d.is_finite() && *d > 0.0);
    let engineer_days = derived.or(supplied);

    EffortSummary {
        totals: EffortTotals {
            engineer_days,
            sites: u32::try_from(sites.len()).ok().filter(|n| *n > 0),
        },
    }
}

// -------- global scope -------------------------------------------------------

fn coerce_global_scope(raw: Option<&Value>) -> GlobalScope {
    let mut scope = GlobalScope::default();
    let Some(Value::Object(gs)) = raw else {
        return scope;
    };

    for phase in Phase::ALL {
        *scope.get_mut(phase) = match shape(gs.get(phase.global_key())) {
            Shape::Mapping(m) => ScopeFlag {
                include: to_bool_opt(m.get("include")),
                notes: trim_opt(m.get("notes")),
            },
            Shape::Scalar(v) => ScopeFlag {
                include: to_bool(v),
                notes: String::new(),
            },
            Shape::Other => ScopeFlag::default(),
        };
    }
    scope
}

// -------- mapping coercers (accept string OR mapping) ------------------------

fn coerce_rollout(raw: Option<&Value>) -> Rollout {
    match shape(raw) {
        Shape::Mapping(m) => Rollout {
            waves: trim_opt(m.get("waves")),
            floors: trim_opt(m.get("floors")),
            ooh_windows: trim_opt(m.get("ooh_windows")),
            change_approvals: trim_opt(m.get("change_approvals")),
        },
        Shape::Scalar(v) => Rollout {
            waves: trim(v),
            ..Rollout::default()
        },
        Shape::Other => Rollout::default(),
    }
}

fn coerce_governance(raw: Option<&Value>) -> Governance {
    match shape(raw) {
        Shape::Mapping(m) => Governance {
            pm: trim_opt(m.get("pm")),
            comms_channels: trim_opt(m.get("comms_channels")),
            escalation: trim_opt(m.get("escalation")),
        },
        Shape::Scalar(v) => Governance {
            pm: trim(v),
            ..Governance::default()
        },
        Shape::Other => Governance::default(),
    }
}

fn coerce_handover(raw: Option<&Value>) -> Handover {
    match shape(raw) {
        Shape::Mapping(m) => Handover {
            docs: trim_opt(m.get("docs")),
            acceptance_criteria: trim_opt(m.get("acceptance_criteria")),
        },
        Shape::Scalar(v) => Handover {
            docs: trim(v),
            ..Handover::default()
        },
        Shape::Other => Handover::default(),
    }
}

fn text_only(v: Option<&Value>) -> String {
    match v {
        Some(v @ (Value::String(_) | Value::Array(_))) => trim(v),
        _ => String::new(),
    }
}

fn coerce_staging(raw: Option<&Value>) -> Staging {
    match shape(raw) {
        Shape::Mapping(m) => Staging {
            ic_used: truthy(m.get("ic_used")),
            doa: truthy(m.get("doa")),
            burn_in: truthy(m.get("burn_in")),
            labelling: text_only(m.get("labelling")),
            packing: text_only(m.get("packing")),
        },
        Shape::Scalar(v) => Staging {
            labelling: trim(v),
            ..Staging::default()
        },
        Shape::Other => Staging::default(),
    }
}

fn coerce_visits_caps(raw: Option<&Value>) -> VisitsCaps {
    match shape(raw) {
        Shape::Mapping(m) => VisitsCaps {
            install_max_visits: to_int_opt(m.get("install_max_visits")),
            post_deploy_max_visits: to_int_opt(m.get("post_deploy_max_visits")),
            site_survey_window_weeks: to_int_opt(m.get("site_survey_window_weeks")),
        },
        Shape::Scalar(v) => VisitsCaps {
            install_max_visits: to_int(v),
            ..VisitsCaps::default()
        },
        Shape::Other => VisitsCaps::default(),
    }
}

fn coerce_counts(raw: Option<&Value>) -> Counts {
    match shape(raw) {
        Shape::Mapping(m) => Counts {
            aps_ordered: to_int_opt(m.get("aps_ordered")),
            aps_to_mount: to_int_opt(m.get("aps_to_mount")),
            devices_total: to_int_opt(m.get("devices_total")),
        },
        Shape::Scalar(v) => Counts {
            devices_total: to_int(v),
            ..Counts::default()
        },
        Shape::Other => Counts::default(),
    }
}

fn coerce_wave_plan(raw: Option<&Value>) -> Vec<WavePlanEntry> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|e| match e {
            Value::Object(w) => Some(WavePlanEntry {
                phase: trim_opt(w.get("phase")),
                floor: trim_opt(w.get("floor")),
                allocations: match w.get("allocations") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(|a| match a {
                            Value::Object(a) => Some(Allocation {
                                model: trim_opt(a.get("model")),
                                qty: to_qty(a.get("qty")),
                            }),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                },
            }),
            _ => None,
        })
        .collect()
}
