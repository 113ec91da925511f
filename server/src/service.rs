//! Creation and retrieval of pastes on top of a [`RecordStore`].
//!
//! No lock is held between store calls. Each call is atomic on its own, and
//! retrieval tolerates the record vanishing between steps.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fadebin_common::CreatePasteRequest;
use rand::prelude::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::task;
use tracing::{debug, error, info, instrument, warn};

use crate::paste::{PasteId, PasteRecord};
use crate::policy;
use crate::short_code;
use crate::store::{Increment, RecordStore, StoreError};
use crate::time::{Clock, SystemClock};
use crate::validation::validate;

/// Statistics show that a collision is very unlikely; this many in a row means
/// something else is wrong.
const MAX_ID_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("paste not found")]
    NotFound,
    #[error("paste expired ({0})")]
    Expired(ExpiryReason),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("failed to find an unused id after {MAX_ID_ATTEMPTS} attempts")]
    IdSpaceExhausted,
}

/// Which limit a paste ran into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryReason {
    Time,
    Views,
}

impl ExpiryReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time expired",
            Self::Views => "view limit reached",
        }
    }
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paste as returned to the reader that just consumed a view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasteView {
    pub id: PasteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub view_count: u32,
    pub max_views: Option<u32>,
    pub is_last_view: bool,
}

pub struct PasteService<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
    rng: Mutex<StdRng>,
    store_timeout: Duration,
}

impl<S: RecordStore, C: Clock> PasteService<S, C> {
    pub fn new(store: Arc<S>, clock: C, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
            store_timeout,
        }
    }

    /// Runs a store operation on the blocking pool, giving up after the
    /// configured timeout.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let join_handle = task::spawn_blocking(move || op(&store));

        match tokio::time::timeout(self.store_timeout, join_handle).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => Err(StoreError::Unavailable(format!("store task failed: {e}"))),
            Err(_) => Err(StoreError::Unavailable(format!(
                "store operation exceeded {:?}",
                self.store_timeout
            ))),
        }
    }

    fn generate_id(&self) -> PasteId {
        // A poisoned rng is still a perfectly good rng.
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.sample(short_code::Generator)
    }

    #[instrument(skip_all)]
    pub async fn create(&self, request: CreatePasteRequest) -> Result<PasteRecord, ServiceError> {
        let paste = validate(request).map_err(ServiceError::Validation)?;

        let now = self.clock.now();
        let mut record = PasteRecord::new(
            self.generate_id(),
            paste.title,
            paste.content,
            now,
            policy::compute_expiry(now, paste.expires_in),
            paste.max_views,
        );

        for _ in 0..MAX_ID_ATTEMPTS {
            let (returned, outcome) = self
                .blocking(move |store| {
                    let outcome = store.create(&record);
                    Ok((record, outcome))
                })
                .await?;
            record = returned;

            match outcome {
                Ok(()) => {
                    info!(id = %record.id, "Created paste");
                    return Ok(record);
                }
                Err(StoreError::DuplicateId) => {
                    debug!(id = %record.id, "Id already taken, retrying");
                    record.id = self.generate_id();
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!("Failed to generate a valid shortcode");
        Err(ServiceError::IdSpaceExhausted)
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &str) -> Result<PasteView, ServiceError> {
        // Anything that can't be an id can't be stored either.
        let id: PasteId = id.parse().map_err(|_| ServiceError::NotFound)?;

        let record = self
            .blocking(move |store| store.get(&id))
            .await?
            .ok_or(ServiceError::NotFound)?;

        if policy::is_time_expired(&record, self.clock.now()) {
            return Err(self.expire(id, ExpiryReason::Time).await);
        }

        if policy::is_view_exhausted(&record) {
            return Err(self.expire(id, ExpiryReason::Views).await);
        }

        let view_count = match self.blocking(move |store| store.increment_view(&id)).await? {
            Some(Increment::Counted(view_count)) => view_count,
            // A concurrent reader took the last view since we looked it up.
            Some(Increment::LimitReached) => {
                return Err(self.expire(id, ExpiryReason::Views).await);
            }
            // Deleted by a concurrent reader since we looked it up.
            None => return Err(ServiceError::NotFound),
        };

        let is_last_view = policy::is_last_view(&record, view_count);
        let view = PasteView {
            id: record.id,
            title: record.title,
            content: record.content,
            created_at: record.created_at,
            expires_at: record.expires_at,
            view_count,
            max_views: record.max_views,
            is_last_view,
        };

        if is_last_view {
            self.discard(id, "final view served").await;
        }

        Ok(view)
    }

    async fn expire(&self, id: PasteId, reason: ExpiryReason) -> ServiceError {
        self.discard(id, reason.as_str()).await;
        ServiceError::Expired(reason)
    }

    /// Best-effort removal. Failures are logged and otherwise ignored.
    async fn discard(&self, id: PasteId, reason: &'static str) {
        match self.blocking(move |store| store.delete(&id)).await {
            Ok(removed) => debug!(%id, reason, removed, "Deleted paste"),
            Err(e) => warn!(%id, reason, "Failed to delete paste: {}", e),
        }
    }

    pub async fn ping(&self) -> Result<DateTime<Utc>, ServiceError> {
        self.blocking(|store| store.ping()).await?;
        Ok(self.clock.now())
    }

    /// Deletes time-expired pastes nobody asked for.
    pub async fn purge_expired(&self) -> Result<usize, ServiceError> {
        let now = self.clock.now();
        Ok(self.blocking(move |store| store.purge_expired(now)).await?)
    }
}
