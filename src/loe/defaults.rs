//! System-owned document content.
//!
//! Default bullet lists and fixed text blocks the post-processor merges into
//! drafts. Built once at startup and shared read-only.

use crate::domain::schema::Phase;

const PROVIDER_PLACEHOLDER: &str = "{provider}";

const FIELD_ENGINEER_TOOLS: &str = "**Field Engineer is expected to provide industry-standard tools including but not limited to:**\n\
- Basic Hand Tools\n\
- Labelling Printer\n\
- Ladder\n\
- Laptop with connecting cable";

const SITE_SURVEY: &[&str] = &[
    "Site Survey may need to be scheduled up to four (4) weeks before installation as appropriate.",
    "Verify that the Customer has a suitable environment for the equipment to be installed, housed, and maintained.",
    "Perform a physical onsite Site Survey at each Customer Site (walk-through with Customer and {provider} engineer).",
    "Cover in the Site Survey report:",
    "  - Confirmation of health and safety requirements.",
    "  - Confirmation of access for the site.",
    "  - Confirmation of data provisions for the site.",
    "  - Confirmation of electrical provision for the site, including sufficient receptacles available on PDU.",
    "  - Confirmation of cabling provision for the site.",
    "  - Confirmation of space availability and condition.",
    "  - Confirmation of environmental conditions for the site.",
    "  - Photographs of key aspects of the site, if allowed.",
    "Complete and submit the Site Survey Report.",
];

const INSTALLATION: &[&str] = &[
    "{provider} will perform the following tasks:",
    "Receive and inventory the equipment.",
    "Check boxes for any damage or triggered tilts and advise the Customer of any faults.",
    "Unbox equipment and check for physical damage.",
    "Validate equipment model and quantity against delivery order or Bill-of-Material (BOM).",
    "Document loose accessories/modules (module cards and SFP/QSFP transceivers) and quantity.",
    "Verify customer-specific asset tag and device hostname label before installation (Customer assists to print/label when required).",
    "Install modules/SFPs as per build document and cabling matrix.",
    "Perform the physical installation and cabling of equipment as per rack elevation diagram and cabling plan.",
    "Patch network cables per cabling matrix, when required.",
    "Print and label power cords, when required.",
    "Install earthing cable for all large equipment, when required.",
    "Connect power cords as per power mapping.",
    "Power on devices for green-light check, including sub-modules (line card/supervisor/power supplies); notify PM of any faults.",
    "If RMA/DOA is required, assist to replace equipment (may require a visit outside of project timeframe depending on OEM parts availability; handled via Change Order process).",
    "Review validation of connectivity with Customer.",
    "Complete Customer-provided QA checklist to ensure installation aligns with Customer build documents.",
    "Validate task completion and receive sign-off.",
    "Engineers can take photographs of devices in the rack (if allowed in the data centre).",
    "Flatten boxes and place at Customer-designated disposal area.",
];

const OPTICS_INSTALLATION: &[&str] = &[
    "Validate optics part numbers and quantities against the Bill-of-Material (BOM).",
    "Install SFP/QSFP transceivers as per the Customer slotting matrix.",
    "Patch fibre and copper connections as per the cabling matrix.",
    "Record optic serial numbers against device and port where required.",
];

const POST_INSTALL: &[&str] = &[
    "Support initial go-live period for the newly installed equipment.",
    "Assist with basic connectivity and reachability checks with the customer team.",
    "Provide ad-hoc troubleshooting for hardware or cabling issues identified immediately after install.",
    "Capture any defects or follow-up actions and hand them back to the project manager.",
];

const PREREQUISITES: &[&str] = &[
    "Client to provide SFP slotting matrix.",
    "Client to provide rack layout matrix.",
    "Client to provide cabling matrix.",
    "Client to provide network cables.",
    "Client to provide power mapping matrix.",
];

const OUT_OF_SCOPE: &[&str] = &[
    "Site remediation including, but not limited to, provisioning of rack space, cooling, and power; and troubleshooting of carrier circuits.",
    "Device wiping or erasing of any operating system (OS) and/or configurations.",
    "Testing of, or access to, existing installed devices.",
    "Configuration development or applying configurations to any devices.",
    "Lift requirements: no work that requires the use of lifts.",
    "Equipment removal: no removal of decommissioned gear from the project site.",
    "Electric power installations: no work that requires electric power installations.",
    "Conduit installation: no cable installations requiring conduit.",
    "Rack/cabinet installations: no rack or cabinet installations.",
    "No materials are provided as part of this engagement, including small consumables such as zip ties and Velcro.",
    "Server lifts: no server lifts are provided.",
    "Field terminations are limited to continuity testing only; no cable certifications.",
    "Certification/Validation: no certification or validation for copper or fibre cables.",
];

const SITE_CARD_BULLETS: &[&str] = &[
    "- Coordinate rack locations, power feeds and patching with the customer team.",
    "- Validate onsite readiness (space, power, cooling and access) before installation.",
];

/// Default content with the provider name filled in.
#[derive(Debug, Clone)]
pub struct DocumentDefaults {
    pub provider: String,
    pub field_engineer_tools: String,
    site_survey: Vec<String>,
    installation: Vec<String>,
    optics_installation: Vec<String>,
    post_install: Vec<String>,
    pub prerequisites: Vec<String>,
    pub out_of_scope: Vec<String>,
}

fn fill(lines: &[&str], provider: &str) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.replace(PROVIDER_PLACEHOLDER, provider))
        .collect()
}

impl DocumentDefaults {
    pub fn standard(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            field_engineer_tools: FIELD_ENGINEER_TOOLS.to_string(),
            site_survey: fill(SITE_SURVEY, provider),
            installation: fill(INSTALLATION, provider),
            optics_installation: fill(OPTICS_INSTALLATION, provider),
            post_install: fill(POST_INSTALL, provider),
            prerequisites: fill(PREREQUISITES, provider),
            out_of_scope: fill(OUT_OF_SCOPE, provider),
        }
    }

    /// Default bullets for a phase section. Lines starting with two spaces
    /// are sub-bullets.
    pub fn phase_bullets(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::SiteSurvey => &self.site_survey,
            Phase::Installation => &self.installation,
            Phase::OpticsInstallation => &self.optics_installation,
            Phase::PostInstall => &self.post_install,
        }
    }

    /// Body for an empty `#### 📍` site card. `phases` are the lower-case
    /// phase names in scope at that site.
    pub fn site_card_body(&self, phases: &[&str]) -> String {
        let sentence = match phases {
            [] => format!(
                "At this site, {} will deliver the in-scope rack & stack activities as defined in this Level of Effort.",
                self.provider
            ),
            [only] => format!(
                "At this site, {} will deliver {only} activities as defined in this Level of Effort.",
                self.provider
            ),
            [init @ .., last] => format!(
                "At this site, {} will deliver {} and {last} activities as defined in this Level of Effort.",
                self.provider,
                init.join(", ")
            ),
        };
        format!("{sentence}\n\n{}", SITE_CARD_BULLETS.join("\n"))
    }
}

impl Default for DocumentDefaults {
    fn default() -> Self {
        Self::standard("WWT")
    }
}
