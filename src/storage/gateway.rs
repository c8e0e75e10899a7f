use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::{
    entities::{ActiveSession, ActivityLog},
    error::{StorageError, StorageResult},
    key_value::KeyValueStore,
};

pub const ACTIVE_SESSION_KEY: &str = "activeSession";
pub const ACTIVITY_LOGS_KEY: &str = "activityLogs";

/// Owns the serialized form of the two records the tracker keeps: the in-progress session and
/// the ordered list of completed logs. Everything read back goes through schema validation, so
/// malformed data surfaces as [StorageError::CorruptState] instead of leaking further.
pub struct PersistenceGateway<S> {
    store: S,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn put_active_session(&mut self, session: &ActiveSession) -> StorageResult<()> {
        self.write(ACTIVE_SESSION_KEY, session)
    }

    pub fn get_active_session(&self) -> StorageResult<Option<ActiveSession>> {
        self.read(ACTIVE_SESSION_KEY)
    }

    /// Same as [Self::get_active_session], except a corrupt session counts as no session.
    pub fn active_session_or_discard(&self) -> StorageResult<Option<ActiveSession>> {
        match self.get_active_session() {
            Err(e) if e.is_corrupt() => {
                warn!("Ignoring active session: {e}");
                Ok(None)
            }
            other => other,
        }
    }

    pub fn clear_active_session(&mut self) -> StorageResult<()> {
        self.remove(ACTIVE_SESSION_KEY)
    }

    /// Read-modify-write of the whole collection. Only safe with a single writer.
    ///
    /// A corrupt collection is reported rather than replaced, appending to it would wipe the
    /// history.
    pub fn append_log(&mut self, log: ActivityLog) -> StorageResult<()> {
        let mut logs = self.get_all_logs()?;
        debug!("Appending log {} to {} existing", log.id, logs.len());
        logs.push(log);
        self.write(ACTIVITY_LOGS_KEY, &logs)
    }

    /// Removes the most recent log with `id`. Returns whether anything was removed.
    pub fn retract_log(&mut self, id: &str) -> StorageResult<bool> {
        let mut logs = self.get_all_logs()?;
        let Some(position) = logs.iter().rposition(|log| log.id == id) else {
            return Ok(false);
        };
        logs.remove(position);
        self.write(ACTIVITY_LOGS_KEY, &logs)?;
        Ok(true)
    }

    pub fn get_all_logs(&self) -> StorageResult<Vec<ActivityLog>> {
        let logs: Vec<ActivityLog> = self.read(ACTIVITY_LOGS_KEY)?.unwrap_or_default();
        for log in &logs {
            log.check_consistency()
                .map_err(|reason| StorageError::CorruptState {
                    key: ACTIVITY_LOGS_KEY,
                    reason,
                })?;
        }
        Ok(logs)
    }

    /// Logs which started between `start` and `end`, both inclusive.
    pub fn get_logs_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<ActivityLog>> {
        Ok(self
            .get_all_logs()?
            .into_iter()
            .filter(|log| log.start_time >= start && log.start_time <= end)
            .collect())
    }

    /// Logs which started on the same calendar day as `now`, in `now`'s timezone.
    pub fn get_today_logs<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> StorageResult<Vec<ActivityLog>> {
        let today = now.date_naive();
        let timezone = now.timezone();
        Ok(self
            .get_all_logs()?
            .into_iter()
            .filter(|log| log.start_time.with_timezone(&timezone).date_naive() == today)
            .collect())
    }

    pub fn clear_all(&mut self) -> StorageResult<()> {
        self.remove(ACTIVITY_LOGS_KEY)?;
        self.remove(ACTIVE_SESSION_KEY)
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> StorageResult<Option<T>> {
        let Some(raw) = self
            .store
            .get(key)
            .map_err(|source| StorageError::Io { key, source })?
        else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::CorruptState {
                key,
                reason: e.to_string(),
            })
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::Io {
            key,
            source: e.into(),
        })?;
        self.store
            .set(key, &raw)
            .map_err(|source| StorageError::Io { key, source })
    }

    fn remove(&mut self, key: &'static str) -> StorageResult<()> {
        self.store
            .remove(key)
            .map_err(|source| StorageError::Io { key, source })
    }
}
