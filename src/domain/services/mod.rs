pub mod geodesic;
pub mod nearest_match;

pub use nearest_match::{MatchNote, NearestMatchSelector, OutletMatch, TIE_BREAK_KM};
