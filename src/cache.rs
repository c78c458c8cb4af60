//! Time-boxed in-memory property snapshot.
//!
//! The cache is owned by the caller and handed out by reference. Refreshes
//! replace the snapshot wholesale; concurrent refreshes race and the last
//! write wins.

use crate::error::Result;
use crate::models::{Property, PropertySnapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct PropertyCache {
    snapshot: RwLock<Option<PropertySnapshot>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PropertyCache {
    pub fn new(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            snapshot: RwLock::new(None),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::weeks(52 * 100)),
            clock,
        }
    }

    /// Current snapshot, or `None` when empty or expired
    pub async fn get(&self) -> Option<PropertySnapshot> {
        let guard = self.snapshot.read().await;
        match guard.as_ref() {
            Some(snapshot) if self.is_fresh(snapshot) => Some(snapshot.clone()),
            _ => None,
        }
    }

    pub async fn is_valid(&self) -> bool {
        self.snapshot
            .read()
            .await
            .as_ref()
            .map(|s| self.is_fresh(s))
            .unwrap_or(false)
    }

    /// Replace the snapshot, stamped with the current time
    pub async fn set(&self, properties: Vec<Property>) -> PropertySnapshot {
        let snapshot = PropertySnapshot::new(properties, self.clock.now());
        info!("Property cache populated with {} properties", snapshot.properties.len());
        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }

    pub async fn clear(&self) {
        *self.snapshot.write().await = None;
        info!("Property cache cleared");
    }

    /// Return the cached snapshot, reloading through `loader` when absent or expired
    pub async fn get_or_refresh<F, Fut>(&self, loader: F) -> Result<PropertySnapshot>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Property>>>,
    {
        if let Some(snapshot) = self.get().await {
            debug!("Property cache hit");
            return Ok(snapshot);
        }

        debug!("Property cache miss, refreshing");
        let properties = loader().await?;
        Ok(self.set(properties).await)
    }

    fn is_fresh(&self, snapshot: &PropertySnapshot) -> bool {
        self.clock.now().signed_duration_since(snapshot.captured_at) < self.ttl
    }
}

/// Locally maintained property records used to fill gaps in upstream data
#[derive(Debug, Clone, Default)]
pub struct LocalPropertyIndex {
    by_id: HashMap<i64, Property>,
}

impl LocalPropertyIndex {
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            by_id: properties.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Load a JSON array of property records
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let properties: Vec<Property> = serde_json::from_str(&raw)?;
        info!("Loaded {} local property records from {}", properties.len(), path.display());
        Ok(Self::new(properties))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Backfill thumbnail URLs for properties that lack them.
    ///
    /// Properties that already have a thumbnail, or have no local record,
    /// pass through unchanged.
    pub fn ensure_thumbnails(&self, properties: Vec<Property>) -> Vec<Property> {
        properties
            .into_iter()
            .map(|mut property| {
                if property.has_thumbnail() {
                    return property;
                }
                if let Some(local) = self.by_id.get(&property.id) {
                    debug!("Backfilling thumbnails for property {}", property.id);
                    property.thumbnail_url = local.thumbnail_url.clone();
                    property.thumbnail_url_medium = local.thumbnail_url_medium.clone();
                    property.thumbnail_url_large = local.thumbnail_url_large.clone();
                }
                property
            })
            .collect()
    }
}
