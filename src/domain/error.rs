//! Domain Error Taxonomy
//!
//! Expected outcomes (validation, not-found, no-coverage) are modeled as
//! distinct variants so the API edge can map them to precise status codes
//! without string matching. Geocoding failures never appear here - the
//! geocoder port absorbs them into `None`.

use thiserror::Error;

/// Errors a resolution request can surface to a caller.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed postal code, rejected before any network call.
    #[error("invalid postal code: {reason}")]
    InvalidCode { reason: String },

    /// Malformed outlet payload or identifier.
    #[error("invalid outlet: {reason}")]
    InvalidOutlet { reason: String },

    /// Both providers reported the code as genuinely absent.
    #[error("postal code {code} not found in any provider")]
    CodeNotFound {
        code: String,
        primary: String,
        secondary: String,
    },

    /// The requested outlet identifier is not in the registry.
    #[error("outlet {0} not found")]
    OutletNotFound(String),

    /// Valid origin, but no eligible outlet satisfies the rules.
    /// Deliberately indistinguishable between "empty registry" and
    /// "none within radius" - callers must not infer registry state.
    #[error("no coverage for this origin")]
    NoCoverage,

    /// At least one provider failed transiently and none succeeded.
    /// Carries both underlying error contexts for diagnostics.
    #[error("postal code providers unavailable for {code}")]
    Upstream {
        code: String,
        primary: String,
        secondary: String,
    },

    /// Registry backing store failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ResolveError {
    /// Expected, user-facing outcomes are never logged as application errors.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Upstream { .. } | Self::Storage(_))
    }
}
