mod geocoder;
mod outlet_repository;
mod postal_provider;

pub use geocoder::Geocoder;
pub use outlet_repository::OutletRepository;
pub use postal_provider::{PostalProvider, ProviderError};
