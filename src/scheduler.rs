//! Periodic jobs: the delivery run every N minutes and the daily history prune.
//!
//! Times are local wall-clock times. Job bodies run on the scheduler task
//! one after another; a forced run from the listener is serialized by the
//! pipeline itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::db::HistoryStore;
use crate::delivery::Pipeline;

const TICK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Every(chrono::Duration),
    DailyAt(NaiveTime),
}

impl Schedule {
    /// First firing strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Schedule::Every(interval) => now + interval,
            Schedule::DailyAt(time) => {
                let today = now.date().and_time(time);
                if today > now {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Run,
    Prune,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub kind: JobKind,
    pub schedule: Schedule,
    pub next_run: NaiveDateTime,
}

impl Job {
    fn new(kind: JobKind, schedule: Schedule, now: NaiveDateTime) -> Self {
        Self {
            kind,
            schedule,
            next_run: schedule.next_after(now),
        }
    }
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    store: HistoryStore,
    max_news_age_days: u32,
    jobs: Vec<Job>,
}

impl Scheduler {
    pub fn new(
        pipeline: Arc<Pipeline>,
        store: HistoryStore,
        run_every: chrono::Duration,
        prune_at: NaiveTime,
        max_news_age_days: u32,
    ) -> Self {
        let now = Local::now().naive_local();
        let jobs = vec![
            Job::new(JobKind::Prune, Schedule::DailyAt(prune_at), now),
            Job::new(JobKind::Run, Schedule::Every(run_every), now),
        ];
        for job in &jobs {
            tracing::info!("Scheduled {:?} job, next at {}", job.kind, job.next_run);
        }
        Self {
            pipeline,
            store,
            max_news_age_days,
            jobs,
        }
    }

    /// Jobs due at `now`, in registration order. Each returned job's next
    /// firing is moved past `now`, so a late tick fires a job once.
    pub fn due_jobs(&mut self, now: NaiveDateTime) -> Vec<JobKind> {
        let mut due = Vec::new();
        for job in self.jobs.iter_mut().filter(|job| job.next_run <= now) {
            due.push(job.kind);
            job.next_run = job.schedule.next_after(now);
        }
        due
    }

    /// Runs forever. Job failures are logged and the loop continues.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(TICK);
        loop {
            ticker.tick().await;
            for kind in self.due_jobs(Local::now().naive_local()) {
                self.execute(kind).await;
            }
        }
    }

    async fn execute(&self, kind: JobKind) {
        match kind {
            JobKind::Run => {
                if let Err(e) = self.pipeline.run().await {
                    tracing::error!("Scheduled run failed: {}", e);
                }
            }
            JobKind::Prune => {
                tracing::info!("Removing news older than {} days", self.max_news_age_days);
                if let Err(e) = self.store.prune(self.max_news_age_days).await {
                    tracing::error!("Scheduled prune failed: {}", e);
                }
            }
        }
    }
}
