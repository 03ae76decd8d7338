//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use crate::domain::error::ResolveError;
use serde::{Deserialize, Serialize};

/// A validated postal code: exactly 8 ASCII digits.
///
/// Parsing strips every non-digit character first, so formatted input
/// like "01001-000" is accepted. Anything that does not leave exactly
/// 8 digits is rejected before any provider is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 8 {
            return Err(ResolveError::InvalidCode {
                reason: format!(
                    "postal code must contain exactly 8 digits, got {} in {:?}",
                    digits.len(),
                    raw
                ),
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing "00000-000" rendering.
    pub fn formatted(&self) -> String {
        format!("{}-{}", &self.0[..5], &self.0[5..])
    }

    /// First two digits, used by the coarse centroid fallback.
    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated outlet identifier: the 14-digit business registration number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutletId(String);

impl OutletId {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        if raw.len() != 14 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(ResolveError::InvalidOutlet {
                reason: format!("outlet id must be exactly 14 digits, got {:?}", raw),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated coordinate pair in degrees.
///
/// Construction fails for NaN or out-of-range values, so a `Coordinates`
/// can always participate in distance math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if Self::is_valid_pair(lat, lng) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    /// Latitude in [-90, 90], longitude in [-180, 180], neither NaN.
    pub fn is_valid_pair(lat: f64, lng: f64) -> bool {
        !lat.is_nan()
            && !lng.is_nan()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
    }
}
