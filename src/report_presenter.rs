use serde::{Serialize, Deserialize};

use crate::api_connection::endpoints::InteractionReport;

/// Coarse risk tier used everywhere a severity or risk label is shown.
///
/// Ordering follows declaration order, so `max` over a set of tiers yields
/// the dominant one and `Unknown` never outranks a real finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Maps the free-form severity and risk labels the backends emit onto a
    /// tier. Variant spellings of the middle band all collapse to `Medium`;
    /// anything unrecognised (including informational entries) stays
    /// `Unknown` rather than being guessed at.
    pub fn from_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return RiskTier::Unknown;
        };
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => RiskTier::High,
            "medium" | "moderate" | "low_to_moderate" | "emerging_concern" => RiskTier::Medium,
            "low" => RiskTier::Low,
            _ => RiskTier::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Unknown => "unknown",
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Presentation bucket for a letter grade: A/B read as reassuring, C as
/// neutral, D/E as a warning. Anything else renders as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeTone {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl GradeTone {
    pub fn from_grade(grade: Option<&str>) -> Self {
        let Some(grade) = grade else {
            return GradeTone::Unknown;
        };
        match grade.trim().to_ascii_uppercase().as_str() {
            "A" | "B" => GradeTone::Positive,
            "C" => GradeTone::Neutral,
            "D" | "E" => GradeTone::Negative,
            _ => GradeTone::Unknown,
        }
    }
}

/// Worst severity tier across a report's matches, `Unknown` when the report
/// has none.
pub fn dominant_tier(report: &InteractionReport) -> RiskTier {
    report
        .matches
        .iter()
        .map(|m| RiskTier::from_label(Some(&m.severity)))
        .max()
        .unwrap_or(RiskTier::Unknown)
}

/// Renders a report as the plain-text block the CLI prints.
pub fn render_report(report: &InteractionReport) -> String {
    let mut out = String::new();

    let grade = report.summary.grade.as_deref().unwrap_or("n/a");
    let score = report
        .summary
        .score
        .map(|s| format!("{:.1}", s))
        .unwrap_or_else(|| "n/a".to_string());
    out.push_str(&format!(
        "Interaction check ({})\n  Grade: {} (score {})\n",
        report.summary.method, grade, score
    ));

    if report.matches.is_empty() {
        out.push_str("  No known interaction matches.\n");
        return out;
    }

    out.push_str(&format!("  Flagged combinations: {}\n", report.summary.matches));
    for m in &report.matches {
        let tier = RiskTier::from_label(Some(&m.severity));
        let codes = m.matched_e_numbers.join(" + ");
        let outcome = m
            .health_outcome_short
            .as_deref()
            .or(m.context.as_deref())
            .unwrap_or("no summary provided");
        let sources = m.sources.len();
        let noun = if sources == 1 { "source" } else { "sources" };
        out.push_str(&format!(
            "  [{}] {}: {} ({} {})\n",
            tier.label(),
            codes,
            outcome,
            sources,
            noun
        ));
    }

    out
}
