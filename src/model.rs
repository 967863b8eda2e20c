//! Shared data model
//!
//! Wire types use camelCase to match the lookup and scoring services.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::selection::Phase;

/// Placeholder rendered for any absent optional field
pub const UNKNOWN: &str = "unknown";

// =============================================================================
// CANDIDATE
// =============================================================================

/// A single lookup result. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub address_line: String,
    #[serde(default)]
    pub region: String,
    /// Built from a deep-link identifier alone; display fields are placeholders
    #[serde(skip)]
    pub provisional: bool,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        address_line: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            address_line: address_line.into(),
            region: region.into(),
            provisional: false,
        }
    }

    /// Placeholder candidate known only by its identifier
    pub fn provisional(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: String::new(),
            address_line: String::new(),
            region: String::new(),
            provisional: true,
        }
    }

    /// Display name, falling back to the identifier for provisional candidates
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.id
        } else {
            &self.display_name
        }
    }
}

// =============================================================================
// NORMALIZED QUERY
// =============================================================================

/// Canonicalized fallback form of a query, produced by [`crate::normalize`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedQuery(pub(crate) String);

impl NormalizedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// RISK ASSESSMENT
// =============================================================================

/// Coarse classification of `probability_of_adverse_outcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn from_probability(p: f64) -> Self {
        if p < 0.2 {
            RiskBand::Low
        } else if p < 0.5 {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
        }
    }
}

/// Risk assessment for one candidate.
///
/// Only `subject_id` and `probability_of_adverse_outcome` are required; every
/// other field is optional and renders as [`UNKNOWN`] when absent. Fields the
/// client does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub subject_id: String,
    pub probability_of_adverse_outcome: f64,
    #[serde(default)]
    pub predicted_metric: Option<f64>,
    #[serde(default)]
    pub top_reason_categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub last_observed_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_observed_metric: Option<f64>,
    #[serde(default)]
    pub last_observed_grade: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RiskAssessment {
    pub fn new(subject_id: impl Into<String>, probability: f64) -> Self {
        Self {
            subject_id: subject_id.into(),
            probability_of_adverse_outcome: probability,
            predicted_metric: None,
            top_reason_categories: None,
            last_observed_date: None,
            last_observed_metric: None,
            last_observed_grade: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn band(&self) -> RiskBand {
        RiskBand::from_probability(self.probability_of_adverse_outcome)
    }

    /// Probability as a rounded percentage, e.g. `"37%"`
    pub fn probability_percent(&self) -> String {
        format!("{:.0}%", self.probability_of_adverse_outcome * 100.0)
    }

    pub fn predicted_metric_display(&self) -> String {
        self.predicted_metric
            .map(|m| format!("{:.1}", m))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn top_reasons_display(&self) -> String {
        match &self.top_reason_categories {
            Some(reasons) if !reasons.is_empty() => reasons.join(", "),
            _ => UNKNOWN.to_string(),
        }
    }

    pub fn last_observed_date_display(&self) -> String {
        self.last_observed_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn last_observed_metric_display(&self) -> String {
        self.last_observed_metric
            .map(|m| format!("{:.0}", m))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn last_observed_grade_display(&self) -> &str {
        self.last_observed_grade.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Accept `YYYY-MM-DD`, RFC 3339 or naive timestamps; anything else is unknown
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_date))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

// =============================================================================
// PRESENTATION VIEW
// =============================================================================

/// Everything presentation needs to draw the current state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoordinatorView {
    pub query: String,
    pub candidates: Vec<Candidate>,
    pub highlighted_index: Option<usize>,
    pub selected_candidate: Option<Candidate>,
    pub phase: Phase,
    pub searching: bool,
    pub search_error: Option<String>,
    pub assessment: Option<RiskAssessment>,
    pub score_error: Option<String>,
    /// "Did you mean ..." suggestion when the fallback query produced the results
    pub fallback_suggestion: Option<NormalizedQuery>,
}

impl CoordinatorView {
    pub fn highlighted(&self) -> Option<&Candidate> {
        self.highlighted_index.and_then(|i| self.candidates.get(i))
    }
}
