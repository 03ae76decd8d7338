//! Nearest-Match Selector
//!
//! Pure domain logic for picking the single best outlet for an origin
//! point. No external dependencies - repositories hand it a snapshot.

use crate::domain::entities::{Outlet, ServiceType};
use crate::domain::services::geodesic::guarded_distance_km;
use crate::domain::value_objects::Coordinates;
use serde::Serialize;

/// Candidates within this distance of the closest one are considered
/// tied, and ties go to the higher priority. A fixed absolute threshold,
/// chosen for near-duplicate addresses - not a floating-point epsilon.
pub const TIE_BREAK_KM: f64 = 0.1;

/// Decision annotations attached to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchNote {
    /// The winner has a service radius configured and the origin is inside it
    RadiusOk,
    /// The winner serves unlimited distance
    NoRadius,
    /// The winner carries a non-zero priority
    PriorityApplied,
    NoPriority,
}

/// The selected outlet plus the computed distance and decision notes.
#[derive(Debug, Clone, Serialize)]
pub struct OutletMatch {
    pub outlet: Outlet,
    pub distance_km: f64,
    pub notes: Vec<MatchNote>,
}

/// Selector applying eligibility, radius, and tie-break rules.
///
/// The algorithm:
/// 1. Drop inactive outlets, outlets without usable coordinates, and -
///    when a filter is given - outlets not serving that segment.
/// 2. Compute guarded distances; candidates with malformed stored
///    coordinates are dropped, never a crash.
/// 3. Drop candidates farther than their own service radius.
/// 4. Sort ascending by distance; among candidates within
///    [`TIE_BREAK_KM`] of the closest, higher priority wins.
pub struct NearestMatchSelector;

impl NearestMatchSelector {
    /// Pick the best outlet for an origin, or `None` for no coverage.
    ///
    /// An empty registry and "none within radius" are deliberately the
    /// same `None` here; the distinct reasons only show up in the logs.
    pub fn pick_nearest(
        outlets: &[Outlet],
        origin: Coordinates,
        filter: Option<ServiceType>,
    ) -> Option<OutletMatch> {
        if outlets.is_empty() {
            tracing::warn!(lat = origin.lat, lng = origin.lng, "no outlets in registry");
            return None;
        }

        let eligible: Vec<&Outlet> = outlets
            .iter()
            .filter(|o| o.active)
            .filter(|o| o.latitude.is_some() && o.longitude.is_some())
            .filter(|o| filter.map_or(true, |t| o.serves(t)))
            .collect();

        if eligible.is_empty() {
            tracing::warn!(
                lat = origin.lat,
                lng = origin.lng,
                filter = filter.map(|t| t.as_str()),
                "no active outlets with coordinates match the filter"
            );
            return None;
        }

        let mut candidates: Vec<(&Outlet, f64)> = Vec::with_capacity(eligible.len());

        for outlet in eligible {
            let distance = match guarded_distance_km(
                origin.lat,
                origin.lng,
                outlet.latitude.unwrap_or(f64::NAN),
                outlet.longitude.unwrap_or(f64::NAN),
            ) {
                Some(d) => d,
                None => {
                    tracing::warn!(outlet_id = %outlet.id, "stored coordinates invalid, skipping");
                    continue;
                }
            };

            if let Some(radius) = outlet.service_radius_km {
                if distance > radius {
                    tracing::debug!(
                        outlet_id = %outlet.id,
                        distance_km = distance,
                        service_radius_km = radius,
                        "outlet outside its service radius"
                    );
                    continue;
                }
            }

            candidates.push((outlet, distance));
        }

        if candidates.is_empty() {
            tracing::warn!(
                lat = origin.lat,
                lng = origin.lng,
                "no outlets within service radius"
            );
            return None;
        }

        // Guarded distances are never NaN, so total_cmp sorts strictly
        // ascending. The tie group is everything within TIE_BREAK_KM of
        // the closest candidate; the highest priority in it wins, and
        // equal priorities keep the nearer candidate.
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let min_distance = candidates[0].1;
        let (winner, distance_km) = candidates
            .iter()
            .take_while(|(_, distance)| distance - min_distance < TIE_BREAK_KM)
            .fold(candidates[0], |best, &candidate| {
                if candidate.0.priority > best.0.priority {
                    candidate
                } else {
                    best
                }
            });

        let notes = vec![
            if winner.service_radius_km.is_some() {
                MatchNote::RadiusOk
            } else {
                MatchNote::NoRadius
            },
            if winner.priority != 0 {
                MatchNote::PriorityApplied
            } else {
                MatchNote::NoPriority
            },
        ];

        tracing::info!(
            outlet_id = %winner.id,
            distance_km,
            priority = winner.priority,
            candidates = candidates.len(),
            "selected nearest outlet"
        );

        Some(OutletMatch {
            outlet: winner.clone(),
            distance_km,
            notes,
        })
    }
}
