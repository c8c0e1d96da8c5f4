//! Image lifecycle status and the annotation-driven transition rule.
//!
//! Status is never incremented. Every time an image's annotation set changes
//! the status is recomputed from the set's cardinality, so replayed or
//! reordered change events converge on the same result.
//!
//! ```text
//! queued ──(1 label)──▶ processing ──(all catalog labels)──▶ success
//!    │                       │
//!    └───────(external failure report)───────▶ fail
//! ```

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ImageStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    #[default]
    Queued,
    Processing,
    Success,
    Fail,
}

/// All valid status strings, as stored in the `images.status` column.
const VALID_STATUS_STRINGS: &[&str] = &["queued", "processing", "success", "fail"];

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "fail" => Ok(Self::Fail),
            _ => Err(CoreError::Validation(format!(
                "Invalid image status '{s}'. Must be one of: {}",
                VALID_STATUS_STRINGS.join(", ")
            ))),
        }
    }

    /// `success` and `fail` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition rule
// ---------------------------------------------------------------------------

/// Derive the status an image should have after its annotation set changed.
///
/// - `cardinality == catalog_size` (and non-zero): `success`
/// - `cardinality == 1`: `processing`
/// - anything else: `current`, unchanged
///
/// The completion check runs first so a single-label catalog completes
/// immediately. `fail` is only ever set by an external report and is never
/// left by recomputation.
pub fn recompute_status(current: ImageStatus, cardinality: i64, catalog_size: i64) -> ImageStatus {
    if current == ImageStatus::Fail {
        return current;
    }
    if catalog_size > 0 && cardinality == catalog_size {
        return ImageStatus::Success;
    }
    if cardinality == 1 {
        return ImageStatus::Processing;
    }
    current
}

/// Outcome of a status recomputation, as persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub previous: ImageStatus,
    pub current: ImageStatus,
    /// Annotation-set cardinality the decision was based on.
    pub cardinality: i64,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const CATALOG: i64 = 5;

    // -- parse / as_str -----------------------------------------------------

    #[test]
    fn status_strings_parse_back() {
        for s in VALID_STATUS_STRINGS {
            assert_eq!(ImageStatus::parse(s).unwrap().as_str(), *s);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert_matches!(ImageStatus::parse("done"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn default_status_is_queued() {
        assert_eq!(ImageStatus::default(), ImageStatus::Queued);
    }

    #[test]
    fn terminal_states() {
        assert!(ImageStatus::Success.is_terminal());
        assert!(ImageStatus::Fail.is_terminal());
        assert!(!ImageStatus::Queued.is_terminal());
        assert!(!ImageStatus::Processing.is_terminal());
    }

    // -- recompute_status ---------------------------------------------------

    #[test]
    fn first_label_moves_to_processing() {
        assert_eq!(
            recompute_status(ImageStatus::Queued, 1, CATALOG),
            ImageStatus::Processing
        );
    }

    #[test]
    fn full_catalog_moves_to_success() {
        assert_eq!(
            recompute_status(ImageStatus::Processing, CATALOG, CATALOG),
            ImageStatus::Success
        );
    }

    #[test]
    fn intermediate_cardinality_leaves_status_unchanged() {
        for n in 2..CATALOG {
            assert_eq!(
                recompute_status(ImageStatus::Processing, n, CATALOG),
                ImageStatus::Processing
            );
            assert_eq!(
                recompute_status(ImageStatus::Queued, n, CATALOG),
                ImageStatus::Queued
            );
        }
    }

    #[test]
    fn empty_set_leaves_status_unchanged() {
        assert_eq!(
            recompute_status(ImageStatus::Queued, 0, CATALOG),
            ImageStatus::Queued
        );
    }

    #[test]
    fn recompute_is_idempotent() {
        for n in 0..=CATALOG {
            let once = recompute_status(ImageStatus::Queued, n, CATALOG);
            let twice = recompute_status(once, n, CATALOG);
            assert_eq!(once, twice, "cardinality {n}");
        }
    }

    #[test]
    fn arrival_order_does_not_matter() {
        // Replaying an earlier cardinality after completion keeps success,
        // because 2..CATALOG is a no-op and 1 cannot follow a larger set.
        let done = recompute_status(ImageStatus::Processing, CATALOG, CATALOG);
        assert_eq!(recompute_status(done, 3, CATALOG), ImageStatus::Success);
    }

    #[test]
    fn single_label_catalog_completes_immediately() {
        assert_eq!(
            recompute_status(ImageStatus::Queued, 1, 1),
            ImageStatus::Success
        );
    }

    #[test]
    fn empty_catalog_never_succeeds() {
        assert_eq!(
            recompute_status(ImageStatus::Queued, 0, 0),
            ImageStatus::Queued
        );
    }

    #[test]
    fn fail_is_sticky() {
        assert_eq!(recompute_status(ImageStatus::Fail, 1, CATALOG), ImageStatus::Fail);
        assert_eq!(
            recompute_status(ImageStatus::Fail, CATALOG, CATALOG),
            ImageStatus::Fail
        );
    }

    #[test]
    fn status_change_reports_whether_it_changed() {
        let change = StatusChange {
            previous: ImageStatus::Queued,
            current: ImageStatus::Processing,
            cardinality: 1,
        };
        assert!(change.changed());
        let same = StatusChange {
            previous: ImageStatus::Processing,
            current: ImageStatus::Processing,
            cardinality: 2,
        };
        assert!(!same.changed());
    }
}
