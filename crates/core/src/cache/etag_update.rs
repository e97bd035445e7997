//! Optimistic read-modify-write over etag entities

use std::sync::Arc;

use cachefront_domain::constants::DEFAULT_ETAG_MAX_RETRIES;
use cachefront_domain::{CacheError, CacheResult, Cacheable, EtagEntity};
use tracing::{debug, instrument, warn};

use super::service::CacheService;

/// Result of one update attempt
#[derive(Debug)]
pub enum UpdateOutcome<T> {
    /// The write landed; carries the stored entity with its new etag
    Success(T),
    /// Someone else wrote first; reload and try again
    Conflict(CacheError),
    /// Not worth retrying
    Failure(CacheError),
}

impl<T> From<CacheResult<T>> for UpdateOutcome<T> {
    fn from(result: CacheResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) if err.is_concurrency() => Self::Conflict(err),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Retries a transform against fresh data until one replace wins
#[derive(Debug, Clone)]
pub struct EtagUpdateHelper {
    cache: Arc<CacheService>,
    max_retries: u32,
}

impl EtagUpdateHelper {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache, max_retries: DEFAULT_ETAG_MAX_RETRIES }
    }

    /// Retries allowed after the first attempt
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Apply `transform` to the current entity and store the result
    ///
    /// `transform` sees `None` when the key is absent, in which case the
    /// result is created. It is re-run against reloaded data after every
    /// conflict. Returns the stored entity carrying its new etag.
    #[instrument(skip(self, transform), fields(cache = %self.cache.name()))]
    pub async fn update_entity<T, F>(&self, key: &str, mut transform: F) -> CacheResult<T>
    where
        T: Cacheable + EtagEntity,
        F: FnMut(Option<T>) -> T,
    {
        let attempts = self.max_retries.saturating_add(1);
        let mut last_conflict = None;

        for attempt in 1..=attempts {
            let current = self.cache.get::<T>(key).await?;
            let updated = transform(current.clone());

            match self.attempt(key, current, updated).await {
                UpdateOutcome::Success(stored) => {
                    debug!(key, attempt, "Etag update applied");
                    return Ok(stored);
                }
                UpdateOutcome::Conflict(err) => {
                    debug!(key, attempt, "Etag conflict, reloading");
                    last_conflict = Some(err);
                }
                UpdateOutcome::Failure(err) => return Err(err),
            }
        }

        warn!(key, attempts, "Etag update retries exhausted");
        let message = format!("Update of key {key} failed after {attempts} attempts");
        Err(match last_conflict {
            Some(conflict) => CacheError::concurrency_caused_by(message, conflict),
            None => CacheError::concurrency(message),
        })
    }

    async fn attempt<T: Cacheable>(&self, key: &str, current: Option<T>, updated: T) -> UpdateOutcome<T> {
        let written = match current {
            None => match self.cache.get_and_put_if_absent(key, updated).await {
                Ok(None) => Ok(()),
                Ok(Some(_)) => Err(CacheError::concurrency(format!("Key {key} was created concurrently"))),
                Err(err) => Err(err),
            },
            Some(_) => match self.cache.get_and_replace(key, updated).await {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(CacheError::concurrency(format!("Key {key} was removed concurrently"))),
                Err(err) => Err(err),
            },
        };
        if let Err(err) = written {
            return UpdateOutcome::from(Err(err));
        }

        match self.cache.get::<T>(key).await {
            Ok(Some(stored)) => UpdateOutcome::Success(stored),
            Ok(None) => UpdateOutcome::Conflict(CacheError::concurrency(format!(
                "Key {key} was removed after update"
            ))),
            Err(err) => UpdateOutcome::from(Err(err)),
        }
    }
}
