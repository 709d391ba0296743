//! Recommendation service: feeds catalog and ledger snapshots to the rankers

use serde::Serialize;
use utoipa::ToSchema;

use super::{bookings::BookingsService, museums::MuseumsService};
use crate::{
    error::{AppError, AppResult},
    models::Museum,
    recommend::{self, NearbyMuseum},
};

/// The three independent rankings
#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationSet {
    pub personalized: Vec<Museum>,
    pub popular: Vec<Museum>,
    /// Empty unless both coordinates were given
    pub nearby: Vec<NearbyMuseum>,
}

/// Visitor position for the proximity ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64, radius_km: Option<f64>) -> AppResult<Self> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::Validation("Coordinates out of range".to_string()));
        }
        let radius_km = radius_km.unwrap_or(recommend::DEFAULT_RADIUS_KM);
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::Validation("radius_km must be positive".to_string()));
        }
        Ok(Self { lat, lon, radius_km })
    }
}

#[derive(Clone)]
pub struct RecommendationsService {
    museums: MuseumsService,
    bookings: BookingsService,
}

impl RecommendationsService {
    pub fn new(museums: MuseumsService, bookings: BookingsService) -> Self {
        Self { museums, bookings }
    }

    pub async fn recommend(&self, interests: &[String], position: Option<Position>) -> AppResult<RecommendationSet> {
        let catalog = self.museums.list().await?;
        let nearby = position
            .map(|p| recommend::nearby(&catalog, p.lat, p.lon, p.radius_km, recommend::NEARBY_TOP_N))
            .unwrap_or_default();
        Ok(RecommendationSet {
            personalized: recommend::personalized(&catalog, interests, recommend::PERSONALIZED_TOP_N),
            popular: recommend::popular(&catalog, recommend::POPULAR_TOP_N),
            nearby,
        })
    }

    /// Museums resembling what has been booked before
    pub async fn from_history(&self) -> AppResult<Vec<Museum>> {
        let catalog = self.museums.list().await?;
        let bookings = self.bookings.ledger_rows().await?;
        Ok(recommend::from_history(&catalog, &bookings, recommend::HISTORY_LIMIT))
    }

    /// A short list from the two most booked museum types; empty without history
    pub async fn from_booked_types(&self) -> AppResult<Vec<Museum>> {
        let catalog = self.museums.list().await?;
        let bookings = self.bookings.ledger_rows().await?;
        Ok(recommend::from_booked_types(
            &catalog,
            &bookings,
            recommend::BOOKED_TYPES,
            recommend::BOOKED_TYPES_LIMIT,
        ))
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<Museum>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let catalog = self.museums.list().await?;
        let mut rng = rand::thread_rng();
        Ok(recommend::search(&catalog, query, recommend::SEARCH_TOP_N, &mut rng))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        ledger::Ledger,
        repository::{MockBookingMirror, MockMuseumStore},
        services::{museums::MuseumFile, tickets::TicketService},
    };
    use uuid::Uuid;

    fn museum(name: &str, lat: f64, lon: f64) -> Museum {
        Museum {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            city: "Kolkata".into(),
            state: "West Bengal".into(),
            museum_type: "Art".into(),
            category: "Painting".into(),
            established: String::new(),
            latitude: Some(lat),
            longitude: Some(lon),
            visitors: None,
        }
    }

    async fn service(catalog: Vec<Museum>) -> RecommendationsService {
        let dir = std::env::temp_dir().join(format!("pixelpast-recommend-{}", Uuid::new_v4()));
        let mut store = MockMuseumStore::new();
        store.expect_list().returning(move || Ok(catalog.clone()));
        let museums = MuseumsService::new(Arc::new(store), MuseumFile::new(dir.join("museums.json")));
        let bookings = BookingsService::new(
            Ledger::open(dir.join("bookings.csv")).await.unwrap(),
            Arc::new(MockBookingMirror::new()),
            TicketService::new(dir.join("qr")),
        );
        RecommendationsService::new(museums, bookings)
    }

    #[test]
    fn test_position_validation() {
        assert_eq!(Position::new(22.5, 88.3, None).unwrap().radius_km, recommend::DEFAULT_RADIUS_KM);
        assert!(Position::new(91.0, 0.0, None).is_err());
        assert!(Position::new(0.0, 0.0, Some(0.0)).is_err());
    }

    #[tokio::test]
    async fn test_nearby_only_with_position() {
        let service = service(vec![museum("Victoria Memorial", 22.5448, 88.3426)]).await;

        let without = service.recommend(&[], None).await.unwrap();
        assert!(without.nearby.is_empty());
        assert_eq!(without.personalized.len(), 1);
        assert_eq!(without.popular.len(), 1);

        let here = Position::new(22.5726, 88.3639, None).unwrap();
        let with = service.recommend(&["painting".to_string()], Some(here)).await.unwrap();
        assert_eq!(with.nearby.len(), 1);
        assert!(with.nearby[0].distance_km < 5.0);
    }

    #[tokio::test]
    async fn test_empty_search_query() {
        let service = service(vec![museum("Victoria Memorial", 22.5, 88.3)]).await;
        assert!(service.search("   ").await.unwrap().is_empty());
        assert_eq!(service.search("victoria").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_without_bookings_returns_catalog_head() {
        let catalog: Vec<Museum> = (0..12).map(|i| museum(&format!("M{}", i), 22.5, 88.3)).collect();
        let service = service(catalog).await;
        assert_eq!(service.from_history().await.unwrap().len(), recommend::HISTORY_LIMIT);
        assert!(service.from_booked_types().await.unwrap().is_empty());
    }
}
