pub mod postal_resolver;
pub mod resolution_service;

pub use postal_resolver::{PostalResolver, ADDRESS_CACHE_TTL};
pub use resolution_service::{
    OriginSource, Resolution, ResolutionOrigin, ResolutionService, NEAREST_CACHE_TTL,
};
