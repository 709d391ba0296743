//! Museum ranking functions.
//!
//! Everything here is pure: callers pass a catalog snapshot (and the booking
//! ledger where needed) and get ranked copies back. An empty catalog always
//! yields empty results.

pub mod geo;
pub mod tfidf;

use std::collections::{HashMap, HashSet};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Booking, Museum};

/// Query used when the visitor gave no interests
pub const DEFAULT_QUERY: &str = "museum art history science";
pub const DEFAULT_RADIUS_KM: f64 = 25.0;
pub const PERSONALIZED_TOP_N: usize = 8;
pub const POPULAR_TOP_N: usize = 8;
pub const NEARBY_TOP_N: usize = 12;
pub const HISTORY_LIMIT: usize = 10;
/// Most booked types considered by [`from_booked_types`]
pub const BOOKED_TYPES: usize = 2;
pub const BOOKED_TYPES_LIMIT: usize = 5;
pub const SEARCH_TOP_N: usize = 5;

/// Seed for the popularity shuffle when no visitor counts are known
const POPULAR_SEED: u64 = 42;

/// Museum with its distance from the query point
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearbyMuseum {
    #[serde(flatten)]
    pub museum: Museum,
    /// Kilometres, rounded to one decimal
    pub distance_km: f64,
}

/// Content similarity between visitor interests and each museum's
/// category, type, city and state.
///
/// Ties keep catalog order.
pub fn personalized(catalog: &[Museum], interests: &[String], top_n: usize) -> Vec<Museum> {
    if catalog.is_empty() {
        return Vec::new();
    }

    let documents: Vec<String> = catalog
        .iter()
        .map(|m| format!("{} {} {} {}", m.category, m.museum_type, m.city, m.state))
        .collect();
    let (model, vectors) = tfidf::TfIdf::fit_transform(&documents);

    let joined = interests
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let query = if joined.is_empty() { DEFAULT_QUERY } else { joined.as_str() };
    let query_vector = model.transform(query);

    let mut scored: Vec<(f64, &Museum)> = vectors
        .iter()
        .map(|v| tfidf::cosine(&query_vector, v))
        .zip(catalog)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored.into_iter().take(top_n).map(|(_, m)| m.clone()).collect()
}

/// Most visited museums first.
///
/// Without any visitor counts the catalog is shuffled with a fixed seed so the
/// list is stable between calls. When every count is zero the order is
/// ascending, which keeps catalog order.
pub fn popular(catalog: &[Museum], top_n: usize) -> Vec<Museum> {
    let mut ranked = catalog.to_vec();

    if ranked.iter().any(|m| m.visitors.is_some()) {
        let visitors = |m: &Museum| m.visitors.unwrap_or(0);
        if ranked.iter().all(|m| visitors(m) == 0) {
            ranked.sort_by_key(visitors);
        } else {
            ranked.sort_by_key(|m| std::cmp::Reverse(visitors(m)));
        }
    } else {
        let mut rng = StdRng::seed_from_u64(POPULAR_SEED);
        ranked.shuffle(&mut rng);
    }

    ranked.truncate(top_n);
    ranked
}

/// Museums within `radius_km` of the point, closest first.
///
/// Entries without usable coordinates are skipped.
pub fn nearby(catalog: &[Museum], lat: f64, lon: f64, radius_km: f64, top_n: usize) -> Vec<NearbyMuseum> {
    let mut found: Vec<(f64, &Museum)> = catalog
        .iter()
        .filter_map(|m| {
            let (mlat, mlon) = m.coordinates()?;
            let d = geo::haversine_km(lat, lon, mlat, mlon);
            (d <= radius_km).then_some((d, m))
        })
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0));

    found
        .into_iter()
        .take(top_n)
        .map(|(d, m)| NearbyMuseum {
            museum: m.clone(),
            distance_km: geo::round_tenth(d),
        })
        .collect()
}

/// Museums matching what has been booked most.
///
/// Catalog museums of the three most booked types come first, topped up with
/// the five most booked museums by name. With no usable history the head of
/// the catalog is returned.
pub fn from_history(catalog: &[Museum], bookings: &[Booking], limit: usize) -> Vec<Museum> {
    let top_types = most_common(bookings.iter().map(|b| b.museum_type.trim()), 3);
    if top_types.is_empty() {
        return catalog.iter().take(limit).cloned().collect();
    }

    let mut picked: Vec<&Museum> = catalog
        .iter()
        .filter(|m| top_types.contains(&m.museum_type.as_str()))
        .collect();

    if picked.len() < limit {
        let top_names = most_common(bookings.iter().map(|b| b.museum.trim()), 5);
        picked.extend(catalog.iter().filter(|m| top_names.contains(&m.name.as_str())));
    }

    let mut seen = HashSet::new();
    picked
        .into_iter()
        .filter(|m| seen.insert(m.id.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

/// Catalog museums of the `types` most booked museum types, in catalog order.
///
/// Unlike [`from_history`] there is no top-up: without booking history the
/// result is empty.
pub fn from_booked_types(catalog: &[Museum], bookings: &[Booking], types: usize, limit: usize) -> Vec<Museum> {
    let top_types = most_common(bookings.iter().map(|b| b.museum_type.trim()), types);
    catalog
        .iter()
        .filter(|m| top_types.contains(&m.museum_type.as_str()))
        .filter(|m| !m.name.trim().is_empty() && !m.city.trim().is_empty())
        .take(limit)
        .cloned()
        .collect()
}

/// Case-insensitive substring search over name, city and type, shuffled
pub fn search<R: Rng + ?Sized>(catalog: &[Museum], query: &str, top_n: usize, rng: &mut R) -> Vec<Museum> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<Museum> = catalog
        .iter()
        .filter(|m| {
            [&m.name, &m.city, &m.museum_type]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    matches.shuffle(rng);
    matches.truncate(top_n);
    matches
}

/// The `n` most frequent non-empty values, ties in first-seen order
fn most_common<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<&'a str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.filter(|v| !v.is_empty()).enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(v, _)| v).collect()
}
