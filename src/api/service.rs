//! Shared state behind the REST handlers: the dataset cache and the named
//! viewer sessions. Every request recomputes its view from the cached records.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::DatasetCache;
use crate::config::DashboardConfig;
use crate::dashboard::{self, DashboardView, GroupReport};
use crate::error::{PipelineError, Result};
use crate::loader::{self, DatasetId, ScanDataset};
use crate::session::{FilterUpdate, Session};

pub const DEFAULT_SESSION: &str = "default";

/// Parse on the blocking pool; file reads and large uploads stay off the
/// async workers.
async fn load_blocking<F>(load: F) -> Result<ScanDataset>
where
    F: FnOnce() -> Result<ScanDataset> + Send + 'static,
{
    tokio::task::spawn_blocking(load)
        .await
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?
}

pub struct DashboardService {
    config: DashboardConfig,
    cache: Arc<RwLock<DatasetCache>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl DashboardService {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            cache: Arc::new(RwLock::new(DatasetCache::new(config.cache_capacity))),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn default_dataset_id(&self) -> DatasetId {
        DatasetId::Default(self.config.default_file_path.clone())
    }

    /// Accepts "default", the default dataset's own id, or an upload id.
    /// Any other `default::<path>` is refused so clients cannot point the
    /// server at arbitrary files.
    pub fn parse_dataset_key(&self, key: &str) -> Result<DatasetId> {
        let default_id = self.default_dataset_id();
        if key.eq_ignore_ascii_case("default") || key == default_id.to_string() {
            return Ok(default_id);
        }
        DatasetId::parse_upload(key).ok_or_else(|| PipelineError::UnknownDataset(key.to_string()))
    }

    pub async fn dataset(&self, id: &DatasetId) -> Result<Arc<ScanDataset>> {
        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(dataset) = cache.get(id) {
                return Ok(dataset);
            }
        }

        match id {
            DatasetId::Default(path) => {
                let path = path.clone();
                let dataset = load_blocking(move || loader::load_from_path(&path)).await?;
                // a concurrent load may have won; keep whichever is cached
                let mut cache = self.cache.write().await;
                cache.get_or_load(id, || Ok(dataset))
            }
            DatasetId::Upload(_) => Err(PipelineError::UnknownDataset(format!(
                "{} (not uploaded or evicted, upload it again)",
                id
            ))),
        }
    }

    pub async fn register_upload(&self, bytes: &[u8]) -> Result<(DatasetId, Arc<ScanDataset>)> {
        let id = DatasetId::for_upload(bytes);
        if let Some(dataset) = self.cache.read().await.get(&id) {
            return Ok((id, dataset));
        }

        let owned = bytes.to_vec();
        let dataset = load_blocking(move || loader::load_from_bytes(&owned)).await?;
        let dataset = self.cache.write().await.get_or_load(&id, || Ok(dataset))?;
        info!("Registered upload {} ({} records)", id, dataset.records.len());
        Ok((id, dataset))
    }

    /// Resolve the session's dataset, apply the dataset-change reset rule and
    /// then the requested filter update. The stored session only changes when
    /// the whole request is valid.
    ///
    /// The dataset is loaded without holding the session map; the update itself
    /// runs under the write lock on the latest stored session, so concurrent
    /// requests on one session never drop each other's changes.
    pub async fn resolve(
        &self,
        session_name: &str,
        dataset_key: Option<&str>,
        update: &FilterUpdate,
    ) -> Result<(Session, Arc<ScanDataset>)> {
        let requested = dataset_key.map(|k| self.parse_dataset_key(k)).transpose()?;

        loop {
            let id = match &requested {
                Some(id) => id.clone(),
                None => self.session_dataset(session_name).await,
            };
            let dataset = self.dataset(&id).await?;

            let mut sessions = self.sessions.write().await;
            let current = sessions.get(session_name).cloned();
            if requested.is_none() {
                let latest = current
                    .as_ref()
                    .map(|s| s.dataset_id.clone())
                    .unwrap_or_else(|| self.default_dataset_id());
                if latest != id {
                    // the session switched datasets while we were loading
                    continue;
                }
            }

            let mut session = match current {
                Some(mut s) => {
                    s.sync_dataset(&id, &dataset);
                    s
                }
                None => Session::new(id, &dataset),
            };
            session.apply(update)?;
            sessions.insert(session_name.to_string(), session.clone());
            return Ok((session, dataset));
        }
    }

    async fn session_dataset(&self, session_name: &str) -> DatasetId {
        self.sessions
            .read()
            .await
            .get(session_name)
            .map(|s| s.dataset_id.clone())
            .unwrap_or_else(|| self.default_dataset_id())
    }

    pub async fn dashboard(
        &self,
        session_name: &str,
        dataset_key: Option<&str>,
        update: &FilterUpdate,
    ) -> Result<DashboardView> {
        let (session, dataset) = self.resolve(session_name, dataset_key, update).await?;
        dashboard::build_dashboard(&dataset, &session, &self.config)
    }

    /// `Ok(None)` when no labor group has this code.
    pub async fn group(
        &self,
        code: &str,
        session_name: &str,
        dataset_key: Option<&str>,
        update: &FilterUpdate,
    ) -> Result<Option<GroupReport>> {
        let Some(group) = self.config.group(code) else {
            return Ok(None);
        };
        let (session, dataset) = self.resolve(session_name, dataset_key, update).await?;
        let (_, matrix) = dashboard::filtered(&dataset, &session);
        dashboard::group_report(&matrix, group, &self.config).map(Some)
    }

    pub async fn session(&self, session_name: &str) -> Option<Session> {
        self.sessions.read().await.get(session_name).cloned()
    }
}
