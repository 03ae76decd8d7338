//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the outlet-locator domain.
//! They have no external dependencies and contain only business logic.

use crate::domain::error::ResolveError;
use crate::domain::value_objects::{Coordinates, OutletId};
use serde::{Deserialize, Serialize};

/// Which postal-code provider produced an address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// Primary provider (BrasilAPI shape).
    BrasilApi,
    /// Secondary provider (ViaCEP shape).
    ViaCep,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrasilApi => "brasilapi",
            Self::ViaCep => "viacep",
        }
    }
}

impl std::fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized address resolved from a postal code.
///
/// Invariant: `code` is digits-only with fixed length, and `city`/`region`
/// are always present once a resolution succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Digits-only postal code (8 characters)
    pub code: String,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    /// Two-letter region code (UF)
    pub region: String,
    /// National administrative (IBGE) code, when the provider supplies it
    pub ibge: Option<String>,
    /// Which provider produced this record
    pub provider: ProviderTag,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl AddressRecord {
    /// Coordinates attached to this record, if present and in range.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
            _ => None,
        }
    }

    /// Single-line form for geocoding queries: street, neighborhood,
    /// city, region, code - skipping absent parts.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(street) = self.street.as_deref() {
            parts.push(street);
        }
        if let Some(neighborhood) = self.neighborhood.as_deref() {
            parts.push(neighborhood);
        }
        parts.push(&self.city);
        parts.push(&self.region);
        parts.push(&self.code);
        parts.join(", ")
    }
}

/// Customer segment an outlet may serve. Used as the optional
/// eligibility filter on resolution requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Business,
    Residential,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Residential => "residential",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferred contact channel for an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
    Whatsapp,
    Phone,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Phone => "phone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "whatsapp" => Some(Self::Whatsapp),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A service location eligible to serve customers.
///
/// Outlets are created or updated via an idempotent upsert keyed by `id`
/// and are never hard-deleted: taking one out of rotation is a flip of
/// the `active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlet {
    /// Business registration number (14 digits), the upsert key
    pub id: String,
    /// Display name
    pub name: String,
    pub legal_name: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub preferred_channel: Option<ContactChannel>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Maximum distance this outlet will serve, in km. Absent = unlimited.
    pub service_radius_km: Option<f64>,
    /// Higher priority wins distance ties
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub serves_business: bool,
    #[serde(default = "default_true")]
    pub serves_residential: bool,
}

impl Outlet {
    /// Coordinates as a validated pair, if present and in range.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng),
            _ => None,
        }
    }

    /// Whether this outlet may serve the given segment.
    pub fn serves(&self, service_type: ServiceType) -> bool {
        match service_type {
            ServiceType::Business => self.serves_business,
            ServiceType::Residential => self.serves_residential,
        }
    }

    /// Validate invariants before an upsert reaches the registry.
    pub fn validate(&self) -> Result<(), ResolveError> {
        OutletId::parse(&self.id)?;
        if self.name.trim().is_empty() {
            return Err(ResolveError::InvalidOutlet {
                reason: "name must not be empty".into(),
            });
        }
        if let Some(radius) = self.service_radius_km {
            if !(radius > 0.0) {
                return Err(ResolveError::InvalidOutlet {
                    reason: format!("service radius must be positive, got {radius}"),
                });
            }
        }
        if let (Some(lat), Some(lng)) = (self.latitude, self.longitude) {
            if !Coordinates::is_valid_pair(lat, lng) {
                return Err(ResolveError::InvalidOutlet {
                    reason: format!("coordinates out of range: ({lat}, {lng})"),
                });
            }
        }
        Ok(())
    }
}
