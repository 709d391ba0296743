//! Museum catalog service.
//!
//! The primary store (PostgreSQL) is tried first for every operation; when it
//! cannot be reached, the JSON fallback file takes the write. Identifiers are
//! issued here, so a record keeps its id whichever store holds it, and
//! [`MuseumsService::reconcile`] later moves file-held records into the
//! primary store.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        museum::{MuseumFilters, MuseumSeedRow},
        CreateMuseum, Listing, Museum, MuseumUpdate, Pagination,
    },
    repository::MuseumStore,
};

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Records copied into the primary store and removed from the file
    pub moved: usize,
    /// Records still held only by the file
    pub remaining: usize,
}

#[derive(Clone)]
pub struct MuseumsService {
    primary: Arc<dyn MuseumStore>,
    fallback: MuseumFile,
}

impl MuseumsService {
    pub fn new(primary: Arc<dyn MuseumStore>, fallback: MuseumFile) -> Self {
        Self { primary, fallback }
    }

    /// Whole catalog, newest first.
    ///
    /// Records waiting in the fallback file are listed ahead of the primary
    /// store's records.
    pub async fn list(&self) -> AppResult<Vec<Museum>> {
        let pending = self.fallback.list().await.unwrap_or_else(|e| {
            tracing::warn!("Listing without fallback file records: {}", e);
            Vec::new()
        });
        match self.primary.list().await {
            Ok(stored) => {
                let known: HashSet<String> = stored.iter().map(|m| m.id.clone()).collect();
                let mut all: Vec<Museum> = pending.into_iter().filter(|m| !known.contains(&m.id)).collect();
                all.extend(stored);
                Ok(all)
            }
            Err(e) if e.is_store_failure() => {
                tracing::warn!("Museum store unavailable, listing fallback file: {}", e);
                Ok(pending)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_paginated(&self, pagination: Option<Pagination>) -> AppResult<Listing<Museum>> {
        Ok(Listing::paginate(self.list().await?, pagination))
    }

    pub async fn create(&self, request: CreateMuseum) -> AppResult<Museum> {
        let museum = request.into_museum(Uuid::new_v4().to_string())?;

        match self.primary.insert(&museum).await {
            Ok(()) => {}
            Err(e) if e.is_store_failure() => {
                tracing::warn!("Museum store unavailable, writing {} to fallback file: {}", museum.id, e);
                self.fallback.insert(&museum).await?;
            }
            Err(e) => return Err(e),
        }

        tracing::info!(id = %museum.id, name = %museum.name, "Museum created");
        Ok(museum)
    }

    /// Apply whitelisted fields from an arbitrary JSON object
    pub async fn update(&self, id: &str, data: &Map<String, Value>) -> AppResult<Museum> {
        let update = MuseumUpdate::from_json(data)?;

        match self.primary.update(id, &update).await {
            Ok(museum) => Ok(museum),
            Err(AppError::NotFound(_)) => self.fallback.update(id, &update).await,
            Err(e) if e.is_store_failure() => {
                tracing::warn!("Museum store unavailable, updating {} in fallback file: {}", id, e);
                self.fallback.update(id, &update).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        match self.primary.delete(id).await {
            Ok(()) => Ok(()),
            Err(AppError::NotFound(_)) => self.fallback.delete(id).await,
            Err(e) if e.is_store_failure() => {
                tracing::warn!("Museum store unavailable, deleting {} from fallback file: {}", id, e);
                self.fallback.delete(id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Copy file-held records into the primary store and drop them from the file
    pub async fn reconcile(&self) -> AppResult<ReconcileReport> {
        let pending = self.fallback.list().await?;
        if pending.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let mut moved = Vec::new();
        let mut failure = None;
        for museum in &pending {
            match self.primary.insert(museum).await {
                Ok(()) | Err(AppError::Conflict(_)) => moved.push(museum.id.clone()),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if !moved.is_empty() {
            self.fallback.remove(&moved).await?;
            tracing::info!("Reconciled {} museum records into the primary store", moved.len());
        }
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(ReconcileReport {
            moved: moved.len(),
            remaining: pending.len() - moved.len(),
        })
    }

    /// Sorted distinct non-empty cities and types
    pub async fn filters(&self) -> AppResult<MuseumFilters> {
        let mut cities = BTreeSet::new();
        let mut types = BTreeSet::new();
        for museum in self.list().await? {
            for (set, value) in [(&mut cities, museum.city), (&mut types, museum.museum_type)] {
                let value = value.trim();
                if !value.is_empty() {
                    set.insert(value.to_string());
                }
            }
        }
        Ok(MuseumFilters {
            cities: cities.into_iter().collect(),
            types: types.into_iter().collect(),
        })
    }

    /// Museums with usable coordinates
    pub async fn locations(&self) -> AppResult<Vec<Museum>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|m| m.coordinates().is_some())
            .collect())
    }

    /// Load the seed CSV into the primary store when it is empty
    pub async fn seed_from_csv(&self, path: &Path) -> AppResult<u64> {
        if self.primary.count().await? > 0 {
            return Ok(0);
        }
        if !path.exists() {
            tracing::warn!("Museum seed file {} not found, skipping", path.display());
            return Ok(0);
        }

        let path = path.to_path_buf();
        let museums = tokio::task::spawn_blocking(move || read_seed_csv(&path))
            .await
            .map_err(|e| AppError::Internal(format!("Seed task failed: {}", e)))??;

        let written = self.primary.insert_many(&museums).await?;
        tracing::info!("Seeded {} museums", written);
        Ok(written)
    }
}

fn read_seed_csv(path: &Path) -> AppResult<Vec<Museum>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut museums = Vec::new();
    let mut skipped = 0;
    for row in reader.deserialize::<MuseumSeedRow>() {
        match row.ok().and_then(|r| r.into_museum(Uuid::new_v4().to_string())) {
            Some(museum) => museums.push(museum),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!("Skipped {} incomplete museum seed rows", skipped);
    }
    Ok(museums)
}

/// JSON file holding catalog records while the primary store is down.
///
/// Records are kept in insertion order; listing returns newest first.
#[derive(Clone)]
pub struct MuseumFile {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl MuseumFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Drop the given ids from the file
    pub async fn remove(&self, ids: &[String]) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.retain(|m| !ids.contains(&m.id));
        self.save(&items).await
    }

    async fn load(&self) -> AppResult<Vec<Museum>> {
        let raw = match tokio::fs::read(self.path.as_path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        // an unreadable file must not be treated as empty: the next save would wipe it
        serde_json::from_slice::<Vec<Museum>>(&raw).map_err(|e| {
            tracing::error!("Unreadable museum fallback file {}: {}", self.path.display(), e);
            AppError::Internal(format!("Unreadable museum fallback file: {}", e))
        })
    }

    async fn save(&self, items: &[Museum]) -> AppResult<()> {
        let body = serde_json::to_vec_pretty(items)
            .map_err(|e| AppError::Internal(format!("Failed to encode museums: {}", e)))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, self.path.as_path()).await?;
        Ok(())
    }
}

#[async_trait]
impl MuseumStore for MuseumFile {
    async fn list(&self) -> AppResult<Vec<Museum>> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.reverse();
        Ok(items)
    }

    async fn insert(&self, museum: &Museum) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        if items.iter().any(|m| m.id == museum.id) {
            return Err(AppError::Conflict(format!("Museum {} already exists", museum.id)));
        }
        items.push(museum.clone());
        self.save(&items).await
    }

    async fn insert_many(&self, museums: &[Museum]) -> AppResult<u64> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let before = items.len();
        for museum in museums {
            if !items.iter().any(|m| m.id == museum.id) {
                items.push(museum.clone());
            }
        }
        let written = (items.len() - before) as u64;
        self.save(&items).await?;
        Ok(written)
    }

    async fn update(&self, id: &str, update: &MuseumUpdate) -> AppResult<Museum> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let museum = items
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Museum with id {} not found", id)))?;
        museum.apply(update);
        let updated = museum.clone();
        self.save(&items).await?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|m| m.id != id);
        if items.len() == before {
            return Err(AppError::NotFound(format!("Museum with id {} not found", id)));
        }
        self.save(&items).await
    }

    async fn count(&self) -> AppResult<i64> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockMuseumStore;
    use serde_json::json;

    fn temp_file() -> MuseumFile {
        MuseumFile::new(
            std::env::temp_dir()
                .join(format!("pixelpast-museums-{}", Uuid::new_v4()))
                .join("admin_museums.json"),
        )
    }

    #[tokio::test]
    async fn test_file_keeps_records_with_numeric_fields() {
        let file = temp_file();
        std::fs::create_dir_all(file.path.parent().unwrap()).unwrap();
        std::fs::write(
            file.path.as_path(),
            r#"[{"id":"keep-1","Name":"Old","City":"Delhi","Established":1949}]"#,
        )
        .unwrap();

        let fresh = create_request("New").into_museum("new-1".to_string()).unwrap();
        file.insert(&fresh).await.unwrap();

        let ids: Vec<String> = file.list().await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["new-1", "keep-1"]);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_never_overwritten() {
        let file = temp_file();
        std::fs::create_dir_all(file.path.parent().unwrap()).unwrap();
        std::fs::write(file.path.as_path(), "{ not json").unwrap();

        let fresh = create_request("New").into_museum("new-1".to_string()).unwrap();
        assert!(file.insert(&fresh).await.is_err());
        assert!(file.remove(&["x".to_string()]).await.is_err());
        assert_eq!(std::fs::read_to_string(file.path.as_path()).unwrap(), "{ not json");
    }

    fn down() -> AppError {
        AppError::StoreUnavailable("connection refused".into())
    }

    fn create_request(name: &str) -> CreateMuseum {
        CreateMuseum {
            name: name.to_string(),
            city: "Kolkata".to_string(),
            museum_type: "History".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_falls_back_and_keeps_id() {
        let mut primary = MockMuseumStore::new();
        primary.expect_insert().times(1).returning(|_| Err(down()));
        primary.expect_list().returning(|| Err(down()));
        let service = MuseumsService::new(Arc::new(primary), temp_file());

        let created = service.create(create_request("Indian Museum")).await.unwrap();
        assert!(Uuid::parse_str(&created.id).is_ok());

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn test_create_validation_is_not_a_fallback() {
        let primary = MockMuseumStore::new();
        let service = MuseumsService::new(Arc::new(primary), temp_file());
        let result = service.create(create_request(" ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_reach_file_records() {
        let mut primary = MockMuseumStore::new();
        primary.expect_insert().returning(|_| Err(down()));
        primary
            .expect_update()
            .returning(|id, _| Err(AppError::NotFound(format!("Museum with id {} not found", id))));
        primary
            .expect_delete()
            .returning(|id| Err(AppError::NotFound(format!("Museum with id {} not found", id))));
        let service = MuseumsService::new(Arc::new(primary), temp_file());

        let created = service.create(create_request("Victoria Memorial")).await.unwrap();
        let data = json!({ "City": "Calcutta", "Latitude": "22.5448" });
        let updated = service.update(&created.id, data.as_object().unwrap()).await.unwrap();
        assert_eq!(updated.city, "Calcutta");
        assert_eq!(updated.latitude, Some(22.5448));

        service.delete(&created.id).await.unwrap();
        assert!(matches!(service.delete(&created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reconcile_moves_file_records() {
        let file = temp_file();
        let museum = create_request("Salar Jung").into_museum("m-1".into()).unwrap();
        file.insert(&museum).await.unwrap();

        let mut primary = MockMuseumStore::new();
        primary
            .expect_insert()
            .withf(|m| m.id == "m-1")
            .times(1)
            .returning(|_| Ok(()));
        let service = MuseumsService::new(Arc::new(primary), file.clone());

        let report = service.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport { moved: 1, remaining: 0 });
        assert_eq!(file.count().await.unwrap(), 0);

        // Nothing left to do on the next pass
        assert_eq!(service.reconcile().await.unwrap(), ReconcileReport::default());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_records_while_primary_is_down() {
        let file = temp_file();
        file.insert(&create_request("A").into_museum("a".into()).unwrap()).await.unwrap();

        let mut primary = MockMuseumStore::new();
        primary.expect_insert().returning(|_| Err(down()));
        let service = MuseumsService::new(Arc::new(primary), file.clone());

        assert!(service.reconcile().await.unwrap_err().is_store_failure());
        assert_eq!(file.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filters_and_locations() {
        let mut with_coords = create_request("Planetarium").into_museum("p".into()).unwrap();
        with_coords.latitude = Some(22.5);
        with_coords.longitude = Some(88.3);
        let mut other = create_request("Rail Museum").into_museum("r".into()).unwrap();
        other.city = "Delhi".into();
        other.museum_type = "Transport".into();
        let catalog = vec![with_coords, other];

        let mut primary = MockMuseumStore::new();
        primary.expect_list().returning(move || Ok(catalog.clone()));
        let service = MuseumsService::new(Arc::new(primary), temp_file());

        let filters = service.filters().await.unwrap();
        assert_eq!(filters.cities, vec!["Delhi", "Kolkata"]);
        assert_eq!(filters.types, vec!["History", "Transport"]);

        let located = service.locations().await.unwrap();
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].id, "p");
    }

    #[tokio::test]
    async fn test_seed_skips_incomplete_rows() {
        let dir = std::env::temp_dir().join(format!("pixelpast-seed-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("museums.csv");
        std::fs::write(
            &csv_path,
            "Name,City,State,Type,Established,Latitude,Longitude\n\
             Indian Museum,Kolkata,West Bengal,History,1814,22.558,88.351\n\
             ,Delhi,Delhi,Art,1949,,\n",
        )
        .unwrap();

        let mut primary = MockMuseumStore::new();
        primary.expect_count().returning(|| Ok(0));
        primary
            .expect_insert_many()
            .withf(|museums| museums.len() == 1 && museums[0].name == "Indian Museum")
            .returning(|museums| Ok(museums.len() as u64));
        let service = MuseumsService::new(Arc::new(primary), temp_file());

        assert_eq!(service.seed_from_csv(&csv_path).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_skipped_for_populated_store() {
        let mut primary = MockMuseumStore::new();
        primary.expect_count().returning(|| Ok(12));
        let service = MuseumsService::new(Arc::new(primary), temp_file());
        assert_eq!(service.seed_from_csv(Path::new("missing.csv")).await.unwrap(), 0);
    }
}
