use chrono::{DateTime, Duration, Local, SubsecRound, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    storage::{
        entities::{ActiveSession, Activity, ActivityLog},
        error::StorageResult,
        gateway::PersistenceGateway,
        key_value::KeyValueStore,
    },
    utils::{clock::Clock, time::activity_date_string},
};

use super::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running(ActiveSession),
}

impl SessionState {
    fn describe(&self) -> String {
        match self {
            SessionState::Idle => "no activity is running".into(),
            SessionState::Running(session) => format!("{} is running", session.activity),
        }
    }
}

/// Moves the tracker between [SessionState::Idle] and [SessionState::Running], keeping the store
/// in step. A transition only commits in memory after every write it needs has succeeded.
pub struct SessionController<S> {
    gateway: PersistenceGateway<S>,
    clock: Box<dyn Clock>,
    state: SessionState,
}

impl<S: KeyValueStore> SessionController<S> {
    /// A controller that starts out idle, regardless of what is stored.
    pub fn new(gateway: PersistenceGateway<S>, clock: Box<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            state: SessionState::Idle,
        }
    }

    /// Picks up a session persisted by an earlier run. A corrupt session is treated as absent.
    pub fn resume(gateway: PersistenceGateway<S>, clock: Box<dyn Clock>) -> StorageResult<Self> {
        let state = match gateway.active_session_or_discard()? {
            Some(session) => SessionState::Running(session),
            None => SessionState::Idle,
        };
        Ok(Self {
            gateway,
            clock,
            state,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Current time at the precision timestamps are stored with.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time().trunc_subsecs(3)
    }

    /// Time since the running activity started, zero when idle.
    pub fn elapsed(&self) -> Duration {
        match &self.state {
            SessionState::Idle => Duration::zero(),
            SessionState::Running(session) => (self.now() - session.start_time).max(Duration::zero()),
        }
    }

    #[instrument(skip(self))]
    pub fn start_activity(&mut self, activity: Activity) -> Result<ActiveSession, SessionError> {
        if let SessionState::Running(_) = self.state {
            return Err(self.violation("start an activity"));
        }

        let now = self.now();
        let session = ActiveSession {
            activity,
            start_time: now,
            activity_date: activity_date_string(&now.with_timezone(&Local)),
        };
        self.gateway.put_active_session(&session)?;
        info!("Started {} at {}", session.activity, session.start_time);

        self.state = SessionState::Running(session.clone());
        Ok(session)
    }

    /// Logs the running activity and returns to idle. The stored session is the source of truth
    /// for when the activity started.
    ///
    /// If the log can't be appended the session stays stored, so ending can be retried. If the
    /// session can't be cleared afterwards the log is taken back out for the same reason.
    #[instrument(skip(self))]
    pub fn end_activity(&mut self) -> Result<ActivityLog, SessionError> {
        if let SessionState::Idle = self.state {
            return Err(self.violation("end an activity"));
        }
        let Some(session) = self.gateway.get_active_session()? else {
            return Err(SessionError::PreconditionViolation {
                operation: "end an activity",
                state: "no active session is stored".into(),
            });
        };

        let log = ActivityLog::complete(&session, self.now(), Uuid::new_v4().to_string());
        self.gateway.append_log(log.clone())?;

        if let Err(e) = self.gateway.clear_active_session() {
            warn!("Failed to clear the active session after logging {}: {e}", log.id);
            if let Err(retract) = self.gateway.retract_log(&log.id) {
                error!("Failed to take back log {}: {retract}", log.id);
            }
            return Err(e.into());
        }

        info!(
            "Logged {} for {}ms as {}",
            log.activity,
            log.duration.num_milliseconds(),
            log.id
        );
        self.state = SessionState::Idle;
        Ok(log)
    }

    /// Drops the running activity without logging it.
    #[instrument(skip(self))]
    pub fn cancel_activity(&mut self) -> Result<ActiveSession, SessionError> {
        let SessionState::Running(session) = &self.state else {
            return Err(self.violation("cancel an activity"));
        };
        let session = session.clone();

        self.gateway.clear_active_session()?;
        info!("Cancelled {} started at {}", session.activity, session.start_time);
        self.state = SessionState::Idle;
        Ok(session)
    }

    /// Removes every log and the running activity, if any.
    pub fn clear_all(&mut self) -> Result<(), SessionError> {
        self.gateway.clear_all()?;
        info!("Cleared all data");
        self.state = SessionState::Idle;
        Ok(())
    }

    fn violation(&self, operation: &'static str) -> SessionError {
        SessionError::PreconditionViolation {
            operation,
            state: self.state.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, io, sync::Arc};

    use anyhow::Result;
    use chrono::Duration;
    use tempfile::tempdir;

    use crate::{
        storage::{
            entities::Activity,
            gateway::{ACTIVE_SESSION_KEY, ACTIVITY_LOGS_KEY, PersistenceGateway},
            key_value::{FileStore, KeyValueStore, MemoryStore, MockKeyValueStore},
        },
        utils::{clock::testing::ManualClock, logging::TEST_LOGGING},
    };

    use super::{SessionController, SessionState};

    /// Memory store that can be told to fail writes to one key.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_set: Option<&'static str>,
        fail_remove: Option<&'static str>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> io::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
            if self.fail_set == Some(key) {
                return Err(io::Error::other("quota exceeded"));
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> io::Result<()> {
            if self.fail_remove == Some(key) {
                return Err(io::Error::other("store unavailable"));
            }
            self.inner.remove(key)
        }
    }

    fn controller<S: KeyValueStore>(
        store: S,
        clock: &Arc<ManualClock>,
    ) -> SessionController<S> {
        SessionController::new(PersistenceGateway::new(store), Box::new(clock.clone()))
    }

    #[test]
    fn test_walking_scenario() -> Result<()> {
        *TEST_LOGGING;
        let clock = Arc::new(ManualClock::at(1000));
        let mut controller = controller(MemoryStore::new(), &clock);

        controller.start_activity(Activity::Walking)?;
        assert!(matches!(controller.state(), SessionState::Running(_)));
        assert_eq!(
            controller
                .gateway()
                .get_active_session()?
                .map(|v| v.start_time.timestamp_millis()),
            Some(1000)
        );

        clock.set(5000);
        assert_eq!(controller.elapsed(), Duration::milliseconds(4000));
        let log = controller.end_activity()?;

        assert_eq!(log.activity, Activity::Walking);
        assert_eq!(log.start_time.timestamp_millis(), 1000);
        assert_eq!(log.end_time.timestamp_millis(), 5000);
        assert_eq!(log.duration, Duration::milliseconds(4000));
        assert_eq!(controller.state(), &SessionState::Idle);
        assert_eq!(controller.gateway().get_active_session()?, None);
        assert_eq!(controller.gateway().get_all_logs()?, vec![log]);
        Ok(())
    }

    #[test]
    fn test_end_while_idle_touches_nothing() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().never();
        store.expect_set().never();
        store.expect_remove().never();
        let clock = Arc::new(ManualClock::at(0));
        let mut controller = controller(store, &clock);

        let error = controller.end_activity().unwrap_err();
        assert!(error.is_precondition_violation());
        assert_eq!(controller.state(), &SessionState::Idle);
    }

    #[test]
    fn test_end_after_session_removed_elsewhere() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::at(1000));
        let mut controller = controller(FileStore::new(dir.path().to_path_buf())?, &clock);
        controller.start_activity(Activity::Sitting)?;
        let state = controller.state().clone();

        // Another process clears the stored session.
        FileStore::new(dir.path().to_path_buf())?.remove(ACTIVE_SESSION_KEY)?;

        clock.set(2000);
        let error = controller.end_activity().unwrap_err();
        assert!(error.is_precondition_violation());
        assert!(controller.gateway().get_all_logs()?.is_empty());
        assert_eq!(controller.state(), &state);
        Ok(())
    }

    #[test]
    fn test_only_one_session_at_a_time() -> Result<()> {
        let clock = Arc::new(ManualClock::at(0));
        let mut controller = controller(MemoryStore::new(), &clock);
        controller.start_activity(Activity::Sitting)?;

        let error = controller.start_activity(Activity::Standing).unwrap_err();
        assert!(error.is_precondition_violation());
        assert_eq!(
            controller.gateway().get_active_session()?.map(|v| v.activity),
            Some(Activity::Sitting)
        );
        Ok(())
    }

    #[test]
    fn test_ids_are_unique() -> Result<()> {
        let clock = Arc::new(ManualClock::at(0));
        let mut controller = controller(MemoryStore::new(), &clock);
        for activity in Activity::ALL {
            controller.start_activity(activity)?;
            controller.end_activity()?;
        }
        let ids = controller
            .gateway()
            .get_all_logs()?
            .into_iter()
            .map(|v| v.id)
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 4);
        Ok(())
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let clock = Arc::new(ManualClock::at(0));
        let store = FlakyStore {
            fail_set: Some(ACTIVE_SESSION_KEY),
            ..Default::default()
        };
        let mut controller = controller(store, &clock);

        assert!(controller.start_activity(Activity::Walking).is_err());
        assert_eq!(controller.state(), &SessionState::Idle);
    }

    #[test]
    fn test_failed_append_keeps_session() -> Result<()> {
        let clock = Arc::new(ManualClock::at(1000));
        let store = FlakyStore {
            fail_set: Some(ACTIVITY_LOGS_KEY),
            ..Default::default()
        };
        let mut controller = controller(store, &clock);
        controller.start_activity(Activity::Standing)?;

        clock.set(2000);
        let error = controller.end_activity().unwrap_err();
        assert!(!error.is_precondition_violation());
        assert!(matches!(controller.state(), SessionState::Running(_)));
        assert!(controller.gateway().get_active_session()?.is_some());
        assert!(controller.gateway().get_all_logs()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_clear_takes_log_back() -> Result<()> {
        let clock = Arc::new(ManualClock::at(1000));
        let store = FlakyStore {
            fail_remove: Some(ACTIVE_SESSION_KEY),
            ..Default::default()
        };
        let mut controller = controller(store, &clock);
        controller.start_activity(Activity::Sitting)?;

        clock.set(3000);
        assert!(controller.end_activity().is_err());
        assert!(matches!(controller.state(), SessionState::Running(_)));
        assert!(controller.gateway().get_active_session()?.is_some());
        assert!(controller.gateway().get_all_logs()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_cancel_discards_session() -> Result<()> {
        let clock = Arc::new(ManualClock::at(0));
        let mut controller = controller(MemoryStore::new(), &clock);
        assert!(controller.cancel_activity().unwrap_err().is_precondition_violation());

        controller.start_activity(Activity::LayingDown)?;
        let cancelled = controller.cancel_activity()?;
        assert_eq!(cancelled.activity, Activity::LayingDown);
        assert_eq!(controller.state(), &SessionState::Idle);
        assert_eq!(controller.gateway().get_active_session()?, None);
        assert!(controller.gateway().get_all_logs()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_resume_picks_up_stored_session() -> Result<()> {
        let clock = Arc::new(ManualClock::at(10_000));
        let mut first = controller(MemoryStore::new(), &clock);
        first.start_activity(Activity::Walking)?;
        let store = first.gateway().store().clone();

        let mut resumed =
            SessionController::resume(PersistenceGateway::new(store), Box::new(clock.clone()))?;
        assert!(matches!(resumed.state(), SessionState::Running(s) if s.activity == Activity::Walking));

        clock.set(70_000);
        let log = resumed.end_activity()?;
        assert_eq!(log.duration, Duration::minutes(1));
        Ok(())
    }

    #[test]
    fn test_resume_ignores_corrupt_session() -> Result<()> {
        let mut store = MemoryStore::new();
        store.set(ACTIVE_SESSION_KEY, "{not json")?;
        let clock = Arc::new(ManualClock::at(0));

        let controller =
            SessionController::resume(PersistenceGateway::new(store), Box::new(clock.clone()))?;
        assert_eq!(controller.state(), &SessionState::Idle);
        Ok(())
    }

    #[test]
    fn test_clear_all_returns_to_idle() -> Result<()> {
        let clock = Arc::new(ManualClock::at(0));
        let mut controller = controller(MemoryStore::new(), &clock);
        controller.start_activity(Activity::Sitting)?;
        controller.end_activity()?;
        controller.start_activity(Activity::Walking)?;

        controller.clear_all()?;
        assert_eq!(controller.state(), &SessionState::Idle);
        assert!(controller.gateway().get_all_logs()?.is_empty());
        assert_eq!(controller.gateway().get_active_session()?, None);
        Ok(())
    }
}
