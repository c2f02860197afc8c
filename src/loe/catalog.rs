//! Rack-unit catalog.
//!
//! A read-only lookup from canonical model name to rack units, loaded once
//! at startup and shared by every request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::normalize::PLAUSIBLE_RACK_UNITS;
use crate::domain::schema::{BomRow, ProjectSchema};

static VENDOR_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Cisco|Juniper|Dell|Arista|HP|HPE)\s+").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Fallback sizes when only the row type is known.
const TYPE_DEFAULTS: &[(&str, u32)] = &[
    ("switch", 1),
    ("firewall", 1),
    ("router", 1),
    ("server-1u", 1),
    ("server-2u", 2),
    ("chassis", 7),
];

/// `"Cisco  c9300-24t"` → `"C9300-24T"`.
pub fn canonical_model(raw: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ");
    VENDOR_PREFIX_RE
        .replace(&collapsed, "")
        .trim()
        .to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct RackUnitCatalog {
    models: HashMap<String, u32>,
    type_defaults: HashMap<String, u32>,
}

impl RackUnitCatalog {
    /// Catalog with type defaults only.
    pub fn type_defaults_only() -> Self {
        Self {
            models: HashMap::new(),
            type_defaults: TYPE_DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    /// Build from `{model: units}` JSON text. Bad rows are skipped.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Value> = serde_json::from_str(text)?;
        let mut catalog = Self::type_defaults_only();

        for (model, units) in raw {
            let Some(units) = units
                .as_u64()
                .or_else(|| units.as_str().and_then(|s| s.trim().parse().ok()))
                .and_then(|n| u32::try_from(n).ok())
            else {
                tracing::debug!(model = %model, "Skipping catalog row without integer rack units");
                continue;
            };
            let canon = canonical_model(&model);
            if !canon.is_empty() {
                catalog.models.insert(canon, units);
            }
        }

        Ok(catalog)
    }

    /// Load from disk. A missing or corrupt file degrades to type defaults.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Rack-unit catalog unavailable, using type defaults");
                return Self::type_defaults_only();
            }
        };

        match Self::from_json_str(&text) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), models = catalog.len(), "Rack-unit catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Rack-unit catalog is corrupt, using type defaults");
                Self::type_defaults_only()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Rack units for a row, without considering what the row already says.
    pub fn lookup(&self, row: &BomRow) -> Option<u32> {
        let canon = canonical_model(&row.model);
        if !canon.is_empty() {
            if let Some(units) = self.models.get(&canon) {
                return Some(*units);
            }
        }
        self.type_defaults
            .get(&row.kind.trim().to_lowercase())
            .copied()
    }

    /// Fill missing `rack_units`. Plausible existing values are kept.
    pub fn enrich_row(&self, row: &mut BomRow) {
        if row
            .rack_units
            .is_some_and(|ru| PLAUSIBLE_RACK_UNITS.contains(&ru))
        {
            return;
        }
        row.rack_units = self.lookup(row);
    }

    /// Enrich every BOM row of every site.
    pub fn enrich(&self, mut schema: ProjectSchema) -> ProjectSchema {
        for site in &mut schema.sites {
            for row in site.bom.iter_mut().chain(site.optics_bom.iter_mut()) {
                self.enrich_row(row);
            }
        }
        schema
    }
}
