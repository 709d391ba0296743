//! Statistics service: booking and catalog analytics, foreign visitor figures

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::{bookings::BookingsService, museums::MuseumsService};
use crate::{
    api::stats::{
        AnalyticsResponse, BookingStats, DistrictVisitors, MonthlyVisitors, MuseumStats, RatingCount,
    },
    error::{AppError, AppResult},
    models::{AttendanceStatus, Booking, Museum},
};

/// Districts listed by [`StatsService::foreign_visitors_by_district`]
pub const TOP_DISTRICTS: usize = 10;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

#[derive(Clone)]
pub struct StatsService {
    bookings: BookingsService,
    museums: MuseumsService,
    foreign_visitors_csv: Arc<PathBuf>,
}

impl StatsService {
    pub fn new(bookings: BookingsService, museums: MuseumsService, foreign_visitors_csv: PathBuf) -> Self {
        Self {
            bookings,
            museums,
            foreign_visitors_csv: Arc::new(foreign_visitors_csv),
        }
    }

    /// Booking figures from the ledger and catalog figures from the catalog.
    ///
    /// A source that cannot be read leaves its section at zero.
    pub async fn analytics(&self) -> AppResult<AnalyticsResponse> {
        let booking_stats = match self.bookings.ledger_rows().await {
            Ok(rows) => booking_stats(&rows),
            Err(e) => {
                tracing::warn!("Ledger unreadable for analytics: {}", e);
                BookingStats::default()
            }
        };
        let museum_stats = match self.museums.list().await {
            Ok(catalog) => museum_stats(&catalog),
            Err(e) => {
                tracing::warn!("Catalog unavailable for analytics: {}", e);
                MuseumStats::default()
            }
        };
        Ok(AnalyticsResponse {
            booking_stats,
            museum_stats,
        })
    }

    pub async fn rating_distribution(&self) -> AppResult<Vec<RatingCount>> {
        Ok(rating_distribution(&self.bookings.ledger_rows().await?))
    }

    /// Visitor totals keyed by year
    pub async fn foreign_visitors_by_year(&self) -> AppResult<BTreeMap<String, i64>> {
        let rows = self.foreign_rows().await?;
        let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
        for row in &rows {
            if let Some(year) = row.year {
                *totals.entry(year).or_default() += row.visitors;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(year, total)| (year.to_string(), total.round() as i64))
            .collect())
    }

    /// Districts with the most visitors, largest first
    pub async fn foreign_visitors_by_district(&self) -> AppResult<Vec<DistrictVisitors>> {
        let rows = self.foreign_rows().await?;
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for row in rows {
            if !row.district.is_empty() {
                *totals.entry(row.district).or_default() += row.visitors;
            }
        }
        let mut ranked: Vec<DistrictVisitors> = totals
            .into_iter()
            .map(|(district, total)| DistrictVisitors {
                district,
                total_visitors: total.round() as i64,
            })
            .collect();
        ranked.sort_by(|a, b| b.total_visitors.cmp(&a.total_visitors));
        ranked.truncate(TOP_DISTRICTS);
        Ok(ranked)
    }

    /// Visitor totals per calendar month across all years
    pub async fn foreign_visitors_monthly(&self) -> AppResult<Vec<MonthlyVisitors>> {
        let rows = self.foreign_rows().await?;
        let mut totals: [Option<f64>; 12] = [None; 12];
        for row in &rows {
            if let Some(index) = month_index(&row.month) {
                *totals[index].get_or_insert(0.0) += row.visitors;
            }
        }
        Ok(totals
            .iter()
            .enumerate()
            .filter_map(|(i, total)| {
                total.map(|t| MonthlyVisitors {
                    month: MONTHS[i].to_string(),
                    visitors: t.round() as i64,
                })
            })
            .collect())
    }

    async fn foreign_rows(&self) -> AppResult<Vec<ForeignRow>> {
        let path = self.foreign_visitors_csv.clone();
        tokio::task::spawn_blocking(move || read_foreign_csv(&path))
            .await
            .map_err(|e| AppError::Internal(format!("Visitor statistics task failed: {}", e)))?
    }
}

pub fn booking_stats(rows: &[Booking]) -> BookingStats {
    let ratings: Vec<f64> = rows.iter().filter_map(|b| b.rating).map(f64::from).collect();
    BookingStats {
        total_bookings: rows.len(),
        attended_bookings: rows
            .iter()
            .filter(|b| b.attended == AttendanceStatus::Attended)
            .count(),
        avg_rating: if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        },
    }
}

pub fn museum_stats(catalog: &[Museum]) -> MuseumStats {
    let mut museums_by_type = BTreeMap::new();
    for museum in catalog {
        let kind = museum.museum_type.trim();
        if !kind.is_empty() {
            *museums_by_type.entry(kind.to_string()).or_insert(0) += 1;
        }
    }
    MuseumStats {
        total_museums: catalog.len(),
        museums_by_type,
    }
}

/// Bookings per rating value, most frequent first; ties list the higher rating first
pub fn rating_distribution(rows: &[Booking]) -> Vec<RatingCount> {
    let mut counts: HashMap<i16, usize> = HashMap::new();
    for rating in rows.iter().filter_map(|b| b.rating) {
        *counts.entry(rating).or_default() += 1;
    }
    let mut distribution: Vec<RatingCount> = counts
        .into_iter()
        .map(|(rating, count)| RatingCount { rating, count })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then(b.rating.cmp(&a.rating)));
    distribution
}

#[derive(Debug, Deserialize)]
struct RawForeignRow {
    #[serde(rename = "District", default)]
    district: String,
    #[serde(rename = "Month", default)]
    month: String,
    #[serde(rename = "Visitors", default)]
    visitors: String,
    #[serde(rename = "Year", default)]
    year: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ForeignRow {
    district: String,
    month: String,
    visitors: f64,
    year: Option<i64>,
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Rows with a numeric visitor count; a missing file reads as empty
fn read_foreign_csv(path: &Path) -> AppResult<Vec<ForeignRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<RawForeignRow>() {
        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Skipping malformed visitor statistics row: {}", e);
                continue;
            }
        };
        let Some(visitors) = parse_number(&raw.visitors) else {
            continue;
        };
        rows.push(ForeignRow {
            district: raw.district,
            month: raw.month,
            visitors,
            year: parse_number(&raw.year).map(|y| y as i64),
        });
    }
    Ok(rows)
}

fn month_index(month: &str) -> Option<usize> {
    let month = month.trim();
    MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::Ledger,
        repository::{MockBookingMirror, MockMuseumStore},
        services::{museums::MuseumFile, tickets::TicketService},
    };
    use uuid::Uuid;

    fn booking(attended: AttendanceStatus, rating: Option<i16>) -> Booking {
        Booking {
            ticket_id: Uuid::new_v4().simple().to_string()[..8].to_string(),
            museum: "Indian Museum".into(),
            date: "2025-03-01".into(),
            time: "10:00".into(),
            people: "2".into(),
            tour_type: "Guided".into(),
            visitor_name: "Ana".into(),
            visitor_email: "ana@example.org".into(),
            visitor_phone: String::new(),
            visitor_age: String::new(),
            special_requests: String::new(),
            emergency_contact: String::new(),
            museum_type: "History".into(),
            attended,
            rating,
            review: None,
        }
    }

    async fn service_with_csv(contents: Option<&str>) -> StatsService {
        let dir = std::env::temp_dir().join(format!("pixelpast-stats-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("foreign.csv");
        if let Some(contents) = contents {
            std::fs::write(&csv_path, contents).unwrap();
        }
        let ledger = Ledger::open(dir.join("bookings.csv")).await.unwrap();
        let bookings = BookingsService::new(
            ledger,
            Arc::new(MockBookingMirror::new()),
            TicketService::new(dir.join("qr")),
        );
        let museums = MuseumsService::new(
            Arc::new(MockMuseumStore::new()),
            MuseumFile::new(dir.join("museums.json")),
        );
        StatsService::new(bookings, museums, csv_path)
    }

    const FOREIGN: &str = "District,Month,Visitors,Year\n\
        Agra,January,1200,2019\n\
        Agra,March,800,2019\n\
        Jaipur,January,500,2020\n\
        Jaipur,February,n/a,2020\n\
        Delhi,march,300.0,2020\n";

    #[test]
    fn test_booking_stats() {
        let rows = vec![
            booking(AttendanceStatus::Attended, Some(5)),
            booking(AttendanceStatus::Attended, Some(4)),
            booking(AttendanceStatus::Pending, None),
            booking(AttendanceStatus::Cancelled, None),
        ];
        let stats = booking_stats(&rows);
        assert_eq!(stats.total_bookings, 4);
        assert_eq!(stats.attended_bookings, 2);
        assert!((stats.avg_rating - 4.5).abs() < 1e-9);

        assert_eq!(booking_stats(&[]).avg_rating, 0.0);
    }

    #[test]
    fn test_rating_distribution_order() {
        let rows = vec![
            booking(AttendanceStatus::Attended, Some(4)),
            booking(AttendanceStatus::Attended, Some(5)),
            booking(AttendanceStatus::Attended, Some(4)),
            booking(AttendanceStatus::Attended, Some(3)),
            booking(AttendanceStatus::Pending, None),
        ];
        let distribution = rating_distribution(&rows);
        assert_eq!(
            distribution,
            vec![
                RatingCount { rating: 4, count: 2 },
                RatingCount { rating: 5, count: 1 },
                RatingCount { rating: 3, count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_foreign_visitor_summaries() {
        let service = service_with_csv(Some(FOREIGN)).await;

        let by_year = service.foreign_visitors_by_year().await.unwrap();
        assert_eq!(by_year.get("2019"), Some(&2000));
        assert_eq!(by_year.get("2020"), Some(&800));

        let districts = service.foreign_visitors_by_district().await.unwrap();
        assert_eq!(districts[0].district, "Agra");
        assert_eq!(districts[0].total_visitors, 2000);
        assert_eq!(districts.len(), 3);

        let monthly = service.foreign_visitors_monthly().await.unwrap();
        let months: Vec<&str> = monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["January", "March"]);
        assert_eq!(monthly[0].visitors, 1700);
        assert_eq!(monthly[1].visitors, 1100);
    }

    #[tokio::test]
    async fn test_missing_visitor_file_is_empty() {
        let service = service_with_csv(None).await;
        assert!(service.foreign_visitors_by_year().await.unwrap().is_empty());
        assert!(service.foreign_visitors_by_district().await.unwrap().is_empty());
        assert!(service.foreign_visitors_monthly().await.unwrap().is_empty());
    }

    #[test]
    fn test_museum_stats_by_type() {
        let museum = |kind: &str| Museum {
            id: Uuid::new_v4().to_string(),
            name: "M".into(),
            city: "C".into(),
            state: "S".into(),
            museum_type: kind.into(),
            category: String::new(),
            established: String::new(),
            latitude: None,
            longitude: None,
            visitors: None,
        };
        let stats = museum_stats(&[museum("Art"), museum("Art"), museum("Science"), museum("")]);
        assert_eq!(stats.total_museums, 4);
        assert_eq!(stats.museums_by_type.get("Art"), Some(&2));
        assert_eq!(stats.museums_by_type.len(), 2);
    }
}
