//! Prefix Centroid Geocoder
//!
//! Coarse last-resort fallback when no real geocoder produced
//! coordinates: the first two digits of a postal code map to the
//! centroid of the corresponding major city. Purely a table lookup,
//! no I/O.

use crate::domain::entities::AddressRecord;
use crate::domain::ports::Geocoder;
use crate::domain::value_objects::Coordinates;
use async_trait::async_trait;

/// Geocoder resolving a postal-code prefix to a city centroid.
pub struct PrefixGeocoder;

impl PrefixGeocoder {
    /// Centroid for a two-digit prefix, if the region is mapped.
    fn centroid(prefix: &str) -> Option<Coordinates> {
        let (lat, lng) = match prefix {
            // São Paulo metro area
            "01" | "02" | "03" | "04" | "05" | "08" => (-23.5505, -46.6333),
            // Rio de Janeiro
            "20" | "21" | "22" => (-22.9068, -43.1729),
            // Belo Horizonte
            "30" => (-19.9191, -43.9378),
            // Salvador
            "40" => (-12.9714, -38.5014),
            // Recife
            "50" => (-8.0476, -34.8770),
            // Fortaleza
            "60" => (-3.7172, -38.5434),
            // Brasília
            "70" => (-15.7942, -47.8825),
            // Curitiba
            "80" => (-25.4244, -49.2654),
            // Porto Alegre
            "90" => (-30.0346, -51.2177),
            _ => return None,
        };
        Coordinates::new(lat, lng)
    }
}

#[async_trait]
impl Geocoder for PrefixGeocoder {
    async fn locate(&self, address: &AddressRecord) -> Option<Coordinates> {
        let prefix = address.code.get(..2)?;
        let coords = Self::centroid(prefix);

        match coords {
            Some(c) => tracing::debug!(
                code = %address.code,
                lat = c.lat,
                lng = c.lng,
                "using prefix centroid fallback"
            ),
            None => tracing::debug!(code = %address.code, "no centroid for prefix"),
        }

        coords
    }
}
