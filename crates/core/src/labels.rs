//! Annotation label enumeration and name validation.
//!
//! The catalog is closed: every label an image can carry is one of the
//! [`AnnotationKind`] variants. Label rows are still created lazily by the
//! store, so the enumeration is the upper bound of the catalog, not its
//! current contents.

use rand::Rng;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum accepted length of a raw label name before normalisation.
pub const MAX_LABEL_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// AnnotationKind
// ---------------------------------------------------------------------------

/// A categorical tag the labeling process can attach to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Mountain,
    Sea,
    Table,
    Chair,
    Forest,
    Building,
    Car,
    Flower,
}

impl AnnotationKind {
    /// Every label in the catalog, in seed order.
    pub const ALL: [AnnotationKind; 8] = [
        Self::Mountain,
        Self::Sea,
        Self::Table,
        Self::Chair,
        Self::Forest,
        Self::Building,
        Self::Car,
        Self::Flower,
    ];

    /// Return the canonical lowercase name stored in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mountain => "mountain",
            Self::Sea => "sea",
            Self::Table => "table",
            Self::Chair => "chair",
            Self::Forest => "forest",
            Self::Building => "building",
            Self::Car => "car",
            Self::Flower => "flower",
        }
    }

    /// Parse a label name. Surrounding whitespace and case are ignored.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        let normalized = normalize_label_name(name)?;
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::InvalidLabel(format!(
                    "'{normalized}' is not a known label. Must be one of: {}",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }

    /// Pick one label uniformly at random from the full enumeration.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Trim and lower-case a raw label name.
///
/// Rejects empty names and names longer than [`MAX_LABEL_NAME_LEN`].
pub fn normalize_label_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidLabel(
            "label name must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_LABEL_NAME_LEN {
        return Err(CoreError::InvalidLabel(format!(
            "label name must not exceed {MAX_LABEL_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_lowercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
