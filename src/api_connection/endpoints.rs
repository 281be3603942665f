use serde::{Serialize, Deserialize};

use crate::additive_normalizer::AdditiveCode;

/// Request body for `POST /interactions/check`. The scoring service expects
/// at least two entries; the orchestrator enforces that before building one.
#[derive(Debug, Serialize, Clone)]
pub struct InteractionCheckRequest {
    pub e_numbers: Vec<String>,
}

impl InteractionCheckRequest {
    pub fn new(codes: &[AdditiveCode]) -> Self {
        Self {
            e_numbers: codes.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

/// Parsed response of the interaction scoring service.
///
/// Optional wire fields stay optional here: an absent score or grade is
/// presented as unknown, never coerced to a default. Fields the contract
/// requires (`summary`, per-match `combo_id`/`severity`/weight/codes) are
/// strict, so a body missing them fails parsing and surfaces as a transport
/// failure instead of a half-empty report.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InteractionReport {
    #[serde(default)]
    pub inputs: Vec<String>,
    pub additives: Option<Vec<AdditiveInfo>>,
    pub summary: ReportSummary,
    #[serde(default)]
    pub matches: Vec<InteractionMatch>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AdditiveInfo {
    pub e_number: String,
    pub name: Option<String>,
    pub group: Option<String>,
    pub basic_risk_level: Option<String>,
    pub adi_mg_per_kg_bw_day: Option<f64>,
    pub simple_user_message: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReportSummary {
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub matches: u32,
    pub method: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InteractionMatch {
    pub combo_id: String,
    pub severity: String,
    pub risk_weight_0to3: u8,
    pub matched_e_numbers: Vec<String>,
    pub health_outcome_short: Option<String>,
    pub context: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceRef {
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub year: Option<String>,
    pub notes: Option<String>,
}

/// Response of `GET /additives/{code}`, the on-demand detail lookup backing
/// the additive detail screen. The service fills these from its curated
/// evidence table when it has an entry, falling back to the authorisation
/// list, so everything beyond the code itself is best-effort.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AdditiveDetail {
    pub e_number: String,
    pub name: Option<String>,
    pub risk_level: Option<String>,
    pub description: Option<String>,
    pub functional_class: Option<String>,
    pub adi: Option<f64>,
    pub exposure_mean_gt_adi: Option<bool>,
    pub exposure_p95_gt_adi: Option<bool>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub organs: Vec<String>,
    #[serde(default)]
    pub health_topics: Vec<String>,
    pub source_title: Option<String>,
    pub source_url: Option<String>,
    pub source_date: Option<String>,
    pub note: Option<String>,
}
