//! Canonical project schema.
//!
//! Every field is always present after normalization. Values the notes did
//! not pin down are `None` and serialize as JSON `null`.

use serde::{Deserialize, Serialize};

/// The fully-typed, default-complete project record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSchema {
    pub loe_type: String,
    pub client: String,
    pub project_name: String,
    pub service: String,
    pub scope: String,
    pub environment: String,
    pub timeline: String,
    pub notes_raw: String,

    pub sites: Vec<Site>,
    pub global_scope: GlobalScope,

    /// Legacy flattened BOM. Always empty: per-site BOMs are the source of truth.
    pub bom: Vec<BomRow>,

    pub rollout: Rollout,
    pub governance: Governance,
    pub handover: Handover,
    pub staging: Staging,
    pub visits_caps: VisitsCaps,
    pub counts: Counts,
    pub wave_plan: Vec<WavePlanEntry>,
    pub effort_summary: EffortSummary,

    pub prerequisites: Vec<String>,
    pub assumptions: Vec<String>,
    pub out_of_scope: Vec<String>,
    pub deliverables: Vec<String>,
    pub constraints: Vec<String>,
}

impl ProjectSchema {
    /// Canonical empty schema carrying only the raw notes.
    pub fn empty(notes_raw: impl Into<String>) -> Self {
        Self {
            notes_raw: notes_raw.into(),
            ..Self::default()
        }
    }

    /// All BOM rows across every site, optics included.
    pub fn all_bom_rows(&self) -> impl Iterator<Item = &BomRow> {
        self.sites
            .iter()
            .flat_map(|s| s.bom.iter().chain(s.optics_bom.iter()))
    }
}

/// A physical location where work is delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    pub name: String,
    pub address: String,
    pub country: String,
    pub role: String,
    pub notes: String,
    pub constraints: Vec<String>,
    pub bom: Vec<BomRow>,
    pub optics_bom: Vec<BomRow>,
    pub tasks: PhaseScope,
    pub assumptions: Vec<String>,
    pub out_of_scope: Vec<String>,

    // Legacy flat inclusion flags, kept as supplied.
    pub survey_in_scope: Option<bool>,
    pub install_in_scope: Option<bool>,
    pub post_in_scope: Option<bool>,
}

impl Site {
    /// Legacy flat flag for a phase, if the phase ever had one.
    pub fn legacy_flag(&self, phase: Phase) -> Option<bool> {
        match phase {
            Phase::SiteSurvey => self.survey_in_scope,
            Phase::Installation => self.install_in_scope,
            Phase::PostInstall => self.post_in_scope,
            Phase::OpticsInstallation => None,
        }
    }

    /// Per-site inclusion: the task flag first, then the legacy flag.
    pub fn includes(&self, phase: Phase) -> Option<bool> {
        self.tasks.get(phase).include.or(self.legacy_flag(phase))
    }
}

/// One bill-of-materials row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BomRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub qty: u32,
    pub notes: String,
    pub rack_units: Option<u32>,
}

/// Stages of on-site work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SiteSurvey,
    Installation,
    OpticsInstallation,
    PostInstall,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::SiteSurvey,
        Phase::Installation,
        Phase::OpticsInstallation,
        Phase::PostInstall,
    ];

    /// Key under `sites[].tasks`.
    pub fn task_key(self) -> &'static str {
        match self {
            Phase::SiteSurvey => "site_survey",
            Phase::Installation => "installation",
            Phase::OpticsInstallation => "optics_installation",
            Phase::PostInstall => "post_install",
        }
    }

    /// Key under `global_scope`.
    pub fn global_key(self) -> &'static str {
        match self {
            Phase::SiteSurvey => "site_survey",
            Phase::Installation => "rack_and_stack",
            Phase::OpticsInstallation => "optics_installation",
            Phase::PostInstall => "post_install",
        }
    }
}

/// Project-wide inclusion of a phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeFlag {
    pub include: Option<bool>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalScope {
    pub site_survey: ScopeFlag,
    pub rack_and_stack: ScopeFlag,
    pub post_install: ScopeFlag,
    pub optics_installation: ScopeFlag,
}

impl GlobalScope {
    pub fn get(&self, phase: Phase) -> &ScopeFlag {
        match phase {
            Phase::SiteSurvey => &self.site_survey,
            Phase::Installation => &self.rack_and_stack,
            Phase::OpticsInstallation => &self.optics_installation,
            Phase::PostInstall => &self.post_install,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut ScopeFlag {
        match phase {
            Phase::SiteSurvey => &mut self.site_survey,
            Phase::Installation => &mut self.rack_and_stack,
            Phase::OpticsInstallation => &mut self.optics_installation,
            Phase::PostInstall => &mut self.post_install,
        }
    }
}

/// Effort and inclusion for one phase at one site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTask {
    pub include: Option<bool>,
    pub engineers: Option<i64>,
    pub days: Option<f64>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseScope {
    pub site_survey: PhaseTask,
    pub installation: PhaseTask,
    pub optics_installation: PhaseTask,
    pub post_install: PhaseTask,
}

impl PhaseScope {
    pub fn get(&self, phase: Phase) -> &PhaseTask {
        match phase {
            Phase::SiteSurvey => &self.site_survey,
            Phase::Installation => &self.installation,
            Phase::OpticsInstallation => &self.optics_installation,
            Phase::PostInstall => &self.post_install,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut PhaseTask {
        match phase {
            Phase::SiteSurvey => &mut self.site_survey,
            Phase::Installation => &mut self.installation,
            Phase::OpticsInstallation => &mut self.optics_installation,
            Phase::PostInstall => &mut self.post_install,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    pub waves: String,
    pub floors: String,
    pub ooh_windows: String,
    pub change_approvals: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Governance {
    pub pm: String,
    pub comms_channels: String,
    pub escalation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Handover {
    pub docs: String,
    pub acceptance_criteria: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Staging {
    pub ic_used: bool,
    pub doa: bool,
    pub burn_in: bool,
    pub labelling: String,
    pub packing: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitsCaps {
    pub install_max_visits: Option<i64>,
    pub post_deploy_max_visits: Option<i64>,
    pub site_survey_window_weeks: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counts {
    pub aps_ordered: Option<i64>,
    pub aps_to_mount: Option<i64>,
    pub devices_total: Option<i64>,
}

/// A rollout wave and the equipment it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WavePlanEntry {
    pub phase: String,
    pub floor: String,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub model: String,
    pub qty: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffortSummary {
    pub totals: EffortTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffortTotals {
    pub engineer_days: Option<f64>,
    pub sites: Option<u32>,
}
