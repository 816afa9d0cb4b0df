//! Wire payload shapes for the course-data service.

use std::collections::BTreeMap;

use serde::Deserialize;

use courselens_shared::Metric;

/// Body of the grades endpoints: an optional average GPA plus a map from
/// grade label (`"A+"` through `"W"`) to how many students received it.
///
/// The service sends the labels as top-level keys next to `gpa`, so the
/// counts are captured by flattening.
#[derive(Debug, Clone, Deserialize)]
pub struct GradesPayload {
    #[serde(default)]
    pub gpa: Option<f64>,

    #[serde(flatten)]
    pub counts: BTreeMap<String, u32>,
}

impl GradesPayload {
    /// The average GPA under the validity rule: absent, null, zero, or
    /// negative all collapse to the sentinel.
    pub fn gpa_metric(&self) -> Metric {
        Metric::from_raw(self.gpa)
    }

    /// Total number of recorded grades, across every label.
    pub fn total_grades(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Body of the instructor ratings endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingsPayload {
    #[serde(default)]
    pub average_rating: Option<f64>,
}

impl RatingsPayload {
    /// The average rating under the same validity rule as GPAs.
    pub fn metric(&self) -> Metric {
        Metric::from_raw(self.average_rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_payload_splits_gpa_from_counts() {
        let json = r#"{"A+": 12, "A": 30, "B-": 7, "W": 4, "gpa": 3.456}"#;
        let payload: GradesPayload = serde_json::from_str(json).expect("deserialize");

        assert_eq!(payload.gpa, Some(3.456));
        assert_eq!(payload.counts.len(), 4);
        assert_eq!(payload.counts.get("A+"), Some(&12));
        assert!(!payload.counts.contains_key("gpa"));
        assert_eq!(payload.total_grades(), 53);
        assert_eq!(payload.gpa_metric().to_string(), "3.46");
    }

    #[test]
    fn grades_payload_null_and_zero_gpa_are_no_data() {
        let null_gpa: GradesPayload =
            serde_json::from_str(r#"{"A": 1, "gpa": null}"#).expect("deserialize");
        assert!(null_gpa.gpa_metric().is_no_data());

        let zero_gpa: GradesPayload =
            serde_json::from_str(r#"{"A": 1, "gpa": 0}"#).expect("deserialize");
        assert!(zero_gpa.gpa_metric().is_no_data());

        let missing: GradesPayload = serde_json::from_str(r#"{"A": 1}"#).expect("deserialize");
        assert!(missing.gpa_metric().is_no_data());
    }

    #[test]
    fn empty_grades_payload() {
        let payload: GradesPayload = serde_json::from_str("{}").expect("deserialize");
        assert!(payload.is_empty());
        assert_eq!(payload.total_grades(), 0);
        assert!(payload.gpa_metric().is_no_data());
    }

    #[test]
    fn ratings_payload_metric() {
        let rated: RatingsPayload =
            serde_json::from_str(r#"{"average_rating": 4.85}"#).expect("deserialize");
        assert_eq!(rated.metric().to_string(), "4.85");

        let unrated: RatingsPayload = serde_json::from_str("{}").expect("deserialize");
        assert!(unrated.metric().is_no_data());

        let zero: RatingsPayload =
            serde_json::from_str(r#"{"average_rating": 0.0}"#).expect("deserialize");
        assert!(zero.metric().is_no_data());
    }
}
