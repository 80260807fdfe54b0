//! Daily per-entity triggers.
//!
//! Each registered entity owns one tokio task that sleeps until the next
//! occurrence of its cron schedule in the registry's zone and then runs the
//! job bound to it. Registering again for the same entity stops the old task
//! before the new one is stored, so an entity never has two live triggers.
//! A stop only interrupts the wait; a firing already in progress finishes.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::SchedulingError;
use crate::models::eat_out::EntityId;
use crate::models::time_spec::TimeSpec;

pub const DEFAULT_MAX_JOBS: usize = 10_000;

/// Work run by a trigger. The entity id is the one captured at registration.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self, entity_id: &str);
}

struct ActiveJob {
    spec: TimeSpec,
    stop: watch::Sender<bool>,
}

impl ActiveJob {
    fn stop(self) {
        // The task may already be gone.
        let _ = self.stop.send(true);
    }
}

pub struct RecurrenceRegistry {
    tz: Tz,
    max_jobs: usize,
    jobs: Mutex<HashMap<EntityId, ActiveJob>>,
}

impl RecurrenceRegistry {
    pub fn new(tz: Tz, max_jobs: usize) -> Self {
        Self {
            tz,
            max_jobs,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Installs a daily trigger running `job` for `entity_id` at `spec`,
    /// replacing any trigger the entity already has.
    pub fn register(
        &self,
        entity_id: &str,
        spec: TimeSpec,
        job: Arc<dyn ScheduledJob>,
    ) -> Result<(), SchedulingError> {
        let expression = spec.cron_expression();
        let schedule = Schedule::from_str(&expression).map_err(|e| {
            SchedulingError::InvalidSchedule {
                expression: expression.clone(),
                reason: e.to_string(),
            }
        })?;
        if schedule.upcoming(self.tz).next().is_none() {
            return Err(SchedulingError::InvalidSchedule {
                expression,
                reason: "no upcoming occurrence".to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|_| SchedulingError::NoRuntime)?;

        let mut jobs = self.lock()?;
        if !jobs.contains_key(entity_id) && jobs.len() >= self.max_jobs {
            return Err(SchedulingError::Capacity(self.max_jobs));
        }

        let (stop, stopped) = watch::channel(false);
        runtime.spawn(run_daily(entity_id.to_string(), schedule, self.tz, job, stopped));
        let previous = jobs.insert(entity_id.to_string(), ActiveJob { spec, stop });
        if let Some(previous) = previous {
            let from = previous.spec;
            previous.stop();
            info!(entity_id, from = %from, to = %spec, "replaced daily reminder");
        } else {
            info!(entity_id, at = %spec, tz = %self.tz, "registered daily reminder");
        }
        Ok(())
    }

    /// Stops the entity's trigger. Returns whether one was active.
    pub fn cancel(&self, entity_id: &str) -> Result<bool, SchedulingError> {
        let removed = self.lock()?.remove(entity_id);
        match removed {
            Some(job) => {
                job.stop();
                info!(entity_id, "cancelled daily reminder");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn scheduled(&self, entity_id: &str) -> Option<TimeSpec> {
        self.lock().ok()?.get(entity_id).map(|job| job.spec)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EntityId, ActiveJob>>, SchedulingError> {
        self.jobs.lock().map_err(|_| SchedulingError::LockPoisoned)
    }
}

impl Drop for RecurrenceRegistry {
    fn drop(&mut self) {
        if let Ok(jobs) = self.jobs.get_mut() {
            for (_, job) in jobs.drain() {
                job.stop();
            }
        }
    }
}

async fn run_daily(
    entity_id: String,
    schedule: Schedule,
    tz: Tz,
    job: Arc<dyn ScheduledJob>,
    mut stopped: watch::Receiver<bool>,
) {
    let mut cursor = Utc::now().with_timezone(&tz);
    loop {
        let Some(next) = schedule.after(&cursor).next() else {
            warn!(entity_id = %entity_id, "schedule has no further occurrences, stopping");
            return;
        };
        let wait = (next.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(entity_id = %entity_id, next = %next, "waiting for next reminder");
        // A closed channel counts as a stop. A pending stop wins over a due firing.
        tokio::select! {
            biased;
            _ = stopped.changed() => {
                debug!(entity_id = %entity_id, "daily reminder stopped");
                return;
            }
            _ = sleep(wait) => {}
        }

        job.run(&entity_id).await;

        // Skip occurrences that passed while the job ran.
        let now = Utc::now().with_timezone(&tz);
        cursor = if now > next { now } else { next };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Tokyo;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    struct ChannelJob {
        label: &'static str,
        tx: mpsc::UnboundedSender<(&'static str, String)>,
    }

    #[async_trait]
    impl ScheduledJob for ChannelJob {
        async fn run(&self, entity_id: &str) {
            let _ = self.tx.send((self.label, entity_id.to_string()));
        }
    }

    fn job(
        label: &'static str,
        tx: &mpsc::UnboundedSender<(&'static str, String)>,
    ) -> Arc<dyn ScheduledJob> {
        Arc::new(ChannelJob {
            label,
            tx: tx.clone(),
        })
    }

    /// Reports when it starts, then pushes after a delay.
    struct SlowJob {
        tx: mpsc::UnboundedSender<(&'static str, String)>,
    }

    #[async_trait]
    impl ScheduledJob for SlowJob {
        async fn run(&self, entity_id: &str) {
            let _ = self.tx.send(("start", entity_id.to_string()));
            sleep(Duration::from_secs(5)).await;
            let _ = self.tx.send(("pushed", entity_id.to_string()));
        }
    }

    fn spec(input: &str) -> TimeSpec {
        TimeSpec::parse(input).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn each_trigger_runs_with_its_own_entity() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("U1", spec("15:30"), job("user", &tx)).unwrap();
        registry.register("G1", spec("15:30"), job("group", &tx)).unwrap();

        let mut seen = HashSet::new();
        while seen.len() < 2 {
            seen.insert(rx.recv().await.unwrap());
        }
        assert!(seen.contains(&("user", "U1".to_string())));
        assert!(seen.contains(&("group", "G1".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn reregistering_replaces_the_previous_trigger() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("U1", spec("8:15"), job("old", &tx)).unwrap();
        registry.register("U1", spec("21:45"), job("new", &tx)).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.scheduled("U1"), Some(spec("21:45")));
        for _ in 0..3 {
            let (label, entity) = rx.recv().await.unwrap();
            assert_eq!(label, "new");
            assert_eq!(entity, "U1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reregistering_lets_a_running_firing_finish() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slow: Arc<dyn ScheduledJob> = Arc::new(SlowJob { tx: tx.clone() });
        registry.register("U1", spec("12:34"), slow).unwrap();

        assert_eq!(rx.recv().await.unwrap(), ("start", "U1".to_string()));
        registry.register("U1", spec("12:34"), job("new", &tx)).unwrap();

        assert_eq!(rx.recv().await.unwrap(), ("pushed", "U1".to_string()));
        assert_eq!(rx.recv().await.unwrap(), ("new", "U1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_lets_a_running_firing_finish_then_stops() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slow: Arc<dyn ScheduledJob> = Arc::new(SlowJob { tx: tx.clone() });
        registry.register("U1", spec("12:34"), slow).unwrap();

        assert_eq!(rx.recv().await.unwrap(), ("start", "U1".to_string()));
        assert!(registry.cancel("U1").unwrap());

        assert_eq!(rx.recv().await.unwrap(), ("pushed", "U1".to_string()));
        let later = tokio::time::timeout(Duration::from_secs(3 * 24 * 60 * 60), rx.recv()).await;
        assert!(later.is_err(), "cancelled trigger fired again: {later:?}");
    }

    #[tokio::test]
    async fn capacity_counts_distinct_entities_only() {
        let registry = RecurrenceRegistry::new(Tokyo, 1);
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("U1", spec("7:10"), job("a", &tx)).unwrap();
        registry.register("U1", spec("7:20"), job("a", &tx)).unwrap();

        let err = registry
            .register("U2", spec("7:10"), job("b", &tx))
            .unwrap_err();
        assert_eq!(err, SchedulingError::Capacity(1));
        assert_eq!(registry.scheduled("U2"), None);
    }

    #[tokio::test]
    async fn cancel_removes_the_trigger() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("U1", spec("7:10"), job("a", &tx)).unwrap();

        assert!(registry.cancel("U1").unwrap());
        assert!(!registry.cancel("U1").unwrap());
        assert!(registry.is_empty());
    }

    #[test]
    fn registering_without_a_runtime_fails() {
        let registry = RecurrenceRegistry::new(Tokyo, DEFAULT_MAX_JOBS);
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = registry
            .register("U1", spec("7:10"), job("a", &tx))
            .unwrap_err();
        assert_eq!(err, SchedulingError::NoRuntime);
        assert!(registry.is_empty());
    }
}
