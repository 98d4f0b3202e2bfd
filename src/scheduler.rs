// src/scheduler.rs
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::engine::ReportEngine;

fn describe_metrics() {
    describe_counter!(
        "scheduled_runs_total",
        "Daily broadcast firings, successful or not."
    );
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

#[derive(Clone, Copy, Debug)]
pub struct DailySchedule {
    pub tz: Tz,
    pub hour: u32,
    pub minute: u32,
}

impl DailySchedule {
    /// First firing strictly after `now`. A wall-clock time skipped by a DST
    /// jump fires one hour later that day.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0)
            .unwrap_or(NaiveTime::MIN);
        let mut day = now.with_timezone(&self.tz).date_naive();

        for _ in 0..3 {
            let naive = day.and_time(at);
            let local = self
                .tz
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| {
                    self.tz
                        .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                        .earliest()
                });
            if let Some(t) = local.map(|t| t.with_timezone(&Utc)) {
                if t > now {
                    return t;
                }
            }
            match day.succ_opt() {
                Some(d) => day = d,
                None => break,
            }
        }
        now + ChronoDuration::days(1)
    }
}

/// Sleep until each daily firing and run the broadcast in its own task, so a
/// slow run never delays the next day. Failures are logged, nothing carries over.
pub fn spawn_daily_broadcast(engine: ReportEngine, schedule: DailySchedule) -> JoinHandle<()> {
    ensure_metrics_described();
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = schedule.next_fire_after(now);
            tracing::info!(next = %next.with_timezone(&schedule.tz), "next scheduled broadcast");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let engine = engine.clone();
            tokio::spawn(async move {
                tracing::info!("Running daily scheduled fetch...");
                counter!("scheduled_runs_total").increment(1);
                if let Err(e) = engine.broadcast_all().await {
                    tracing::warn!(error = %e, "scheduled broadcast failed");
                }
            });
        }
    })
}
