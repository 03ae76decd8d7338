mod dashmap_outlet_repo;
mod geocoders;
mod postal_providers;
mod prefix_geocoder;
mod sqlite_outlet_repo;

pub use dashmap_outlet_repo::DashMapOutletRepository;
pub use geocoders::{DisabledGeocoder, GeocodeProviderKind, HttpGeocoder};
pub use postal_providers::{BrasilApiProvider, ViaCepProvider};
pub use prefix_geocoder::PrefixGeocoder;
pub use sqlite_outlet_repo::SqliteOutletRepository;
