//! Core domain types for CourseLens enrichment.

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// A supplementary statistic as shown on the page: either a usable number
/// or the "no data" sentinel.
///
/// Upstream sends `0` or `null` for courses and instructors it has no
/// records for, so only a strictly positive value counts as data. Network
/// and payload failures are also collapsed into [`Metric::NoData`] at the
/// gateway boundary; by the time a metric reaches rendering there is no
/// error case left to handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    NoData,
}

impl Metric {
    /// Apply the upstream validity rule: absent, null, zero, or negative
    /// all mean "no data".
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(v) if v > 0.0 => Self::Value(v),
            _ => Self::NoData,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl std::fmt::Display for Metric {
    /// Values render with exactly two decimals; the sentinel renders as
    /// the literal text `None`, matching what the page shows.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::NoData => f.write_str("None"),
        }
    }
}

// ---------------------------------------------------------------------------
// EnrichmentResult
// ---------------------------------------------------------------------------

/// Which statistic an enrichment task resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentKind {
    /// Average GPA for a course.
    Gpa,
    /// Average rating for an instructor.
    Rating,
}

impl std::fmt::Display for EnrichmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpa => f.write_str("gpa"),
            Self::Rating => f.write_str("rating"),
        }
    }
}

/// The outcome of one gateway lookup, handed to the presenter exactly once.
/// Results are ephemeral: rendered, logged, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub kind: EnrichmentKind,
    /// Course id or instructor name the value belongs to.
    pub subject: String,
    pub value: Metric,
}

impl EnrichmentResult {
    pub fn new(kind: EnrichmentKind, subject: impl Into<String>, value: Metric) -> Self {
        Self {
            kind,
            subject: subject.into(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// A course container discovered on the page, keyed by the page-assigned
/// element id. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseRecord {
    pub id: String,
}

impl CourseRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_positive_values_render_two_decimals() {
        assert_eq!(Metric::from_raw(Some(3.456)).to_string(), "3.46");
        assert_eq!(Metric::from_raw(Some(4.0)).to_string(), "4.00");
        assert_eq!(Metric::from_raw(Some(0.5)).to_string(), "0.50");
    }

    #[test]
    fn metric_sentinel_for_unusable_values() {
        assert_eq!(Metric::from_raw(None), Metric::NoData);
        assert_eq!(Metric::from_raw(Some(0.0)), Metric::NoData);
        assert_eq!(Metric::from_raw(Some(-1.2)), Metric::NoData);
        assert_eq!(Metric::from_raw(Some(f64::NAN)), Metric::NoData);
        assert_eq!(Metric::NoData.to_string(), "None");
    }

    #[test]
    fn enrichment_result_carries_subject() {
        let result = EnrichmentResult::new(EnrichmentKind::Gpa, "CMSC131", Metric::Value(3.2));
        assert_eq!(result.subject, "CMSC131");
        assert!(!result.value.is_no_data());
    }
}
