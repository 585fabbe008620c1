//! Persistent accessory state.
//!
//! The whole [`AccessoryState`] is stored as one fixed-size record at
//! domain `0x00`, key `0x00` of a [`KeyValueStore`]. Loading never fails:
//! anything other than a well-formed record means "start from defaults".
//! Saving retries transient backend errors with exponential backoff.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::app::ports::{KeyValueStore, StorageError};
use crate::error::StoreError;
use crate::state::{AccessoryState, RECORD_LEN};

/// Storage domain holding the accessory record.
pub const STATE_DOMAIN: u8 = 0x00;
/// Key of the accessory record within [`STATE_DOMAIN`].
pub const STATE_KEY: u8 = 0x00;

/// Save retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub attempts: u8,
    /// Delay before the first retry; doubled for every further retry.
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 20,
        }
    }
}

/// Result of reading the stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Restored(AccessoryState),
    /// No record has ever been saved.
    Absent,
    /// A blob exists but its length is not [`RECORD_LEN`].
    SizeMismatch(usize),
    /// Right length, but the version or band check failed.
    Malformed,
    ReadFailed(StorageError),
}

impl LoadOutcome {
    pub fn into_state(self) -> Option<AccessoryState> {
        match self {
            Self::Restored(state) => Some(state),
            _ => None,
        }
    }
}

pub struct PersistentStateStore<K: KeyValueStore, D: DelayNs> {
    kv: K,
    delay: D,
    retry: RetryPolicy,
}

impl<K: KeyValueStore, D: DelayNs> PersistentStateStore<K, D> {
    pub fn new(kv: K, delay: D, retry: RetryPolicy) -> Self {
        Self { kv, delay, retry }
    }

    /// Read the stored record.
    ///
    /// Returns `None` when no record exists, when the stored blob has the
    /// wrong size or shape, or when the backend read fails.
    pub fn load(&self) -> Option<AccessoryState> {
        self.load_outcome().into_state()
    }

    /// Read the stored record and report why it was or was not usable.
    ///
    /// Each outcome is logged on its own path: absence at `info`, a size
    /// mismatch or malformed body at `warn`, a backend failure at `error`.
    pub fn load_outcome(&self) -> LoadOutcome {
        // One spare byte so an oversized blob is seen as such.
        let mut buf = [0u8; RECORD_LEN + 1];
        match self.kv.get(STATE_DOMAIN, STATE_KEY, &mut buf) {
            Ok(None) => {
                info!("store: no saved state, using defaults");
                LoadOutcome::Absent
            }
            Ok(Some(len)) if len != RECORD_LEN => {
                warn!(
                    "store: saved state size mismatch ({} bytes, expected {}), using defaults",
                    len, RECORD_LEN
                );
                LoadOutcome::SizeMismatch(len)
            }
            Ok(Some(_)) => match AccessoryState::decode(&buf[..RECORD_LEN]) {
                Some(state) => {
                    info!(
                        "store: restored state (power={}, air={})",
                        state.power(),
                        state.air_label()
                    );
                    LoadOutcome::Restored(state)
                }
                None => {
                    warn!("store: saved state is malformed, using defaults");
                    LoadOutcome::Malformed
                }
            },
            Err(e) => {
                error!("store: read failed ({}), using defaults", e);
                LoadOutcome::ReadFailed(e)
            }
        }
    }

    /// Write the record, retrying backend failures per the retry policy.
    pub fn save(&mut self, state: &AccessoryState) -> Result<(), StoreError> {
        let record = state.encode().ok_or(StoreError::Encode)?;

        let mut backoff_ms = self.retry.backoff_ms;
        let mut attempt: u8 = 0;
        loop {
            match self.kv.set(STATE_DOMAIN, STATE_KEY, &record) {
                Ok(()) => {
                    if attempt > 0 {
                        info!("store: saved after {} retries", attempt);
                    }
                    return Ok(());
                }
                Err(e) if attempt < self.retry.attempts => {
                    attempt += 1;
                    warn!(
                        "store: write failed ({}), retry {}/{} in {} ms",
                        e, attempt, self.retry.attempts, backoff_ms
                    );
                    self.delay.delay_ms(backoff_ms);
                    backoff_ms = backoff_ms.saturating_mul(2);
                }
                Err(e) => {
                    error!("store: write failed ({}), giving up", e);
                    return Err(StoreError::Write(e));
                }
            }
        }
    }

    /// Delete the stored record (factory reset).
    pub fn purge(&mut self) -> Result<(), StoreError> {
        self.kv
            .remove(STATE_DOMAIN, STATE_KEY)
            .map_err(StoreError::Write)?;
        info!("store: saved state purged");
        Ok(())
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
