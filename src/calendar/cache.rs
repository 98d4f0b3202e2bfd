// src/calendar/cache.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::filter::{window_bounds, Window};
use super::types::{EconomicEvent, FeedSnapshot};

/// On-disk snapshot of the last good fetch.
///
/// The file is a plain JSON array of events. Snapshot age comes from the
/// file's modification time, which `save` pins to the snapshot's
/// `fetched_at`. A snapshot goes stale when it is older than `max_age`
/// (zero disables) or, with a week zone set, when it was fetched in an
/// earlier Sunday-start week than "now".
#[derive(Debug, Clone)]
pub struct FeedCacheStore {
    path: PathBuf,
    max_age: ChronoDuration,
    week_tz: Option<Tz>,
}

impl FeedCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: ChronoDuration::zero(),
            week_tz: None,
        }
    }

    /// Expire snapshots at the Sunday 00:00 week boundary in `tz`.
    pub fn with_week_tz(mut self, tz: Tz) -> Self {
        self.week_tz = Some(tz);
        self
    }

    /// `secs` of 0 disables the age check.
    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_age = i64::try_from(secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .unwrap_or(ChronoDuration::MAX);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted snapshot if present, parseable and not stale.
    /// Corrupt files are reported as absent.
    pub async fn load(&self) -> Option<FeedSnapshot> {
        self.load_at(Utc::now()).await
    }

    pub async fn load_at(&self, now: DateTime<Utc>) -> Option<FeedSnapshot> {
        let raw = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache read failed");
                return None;
            }
        };

        let events: Vec<EconomicEvent> = match serde_json::from_slice(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache corrupt, ignoring");
                return None;
            }
        };

        let fetched_at = fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or(now);

        if self.is_stale(fetched_at, now) {
            tracing::info!(
                path = %self.path.display(),
                fetched_at = %fetched_at,
                "cache expired"
            );
            return None;
        }

        Some(FeedSnapshot::new(events, fetched_at))
    }

    fn is_stale(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.max_age > ChronoDuration::zero() && now - fetched_at > self.max_age {
            return true;
        }
        match self.week_tz {
            Some(tz) => {
                week_start(fetched_at.with_timezone(&tz).date_naive())
                    < week_start(now.with_timezone(&tz).date_naive())
            }
            None => false,
        }
    }

    /// Replace the cache with `snapshot`. Writes a sibling temp file and
    /// renames it over the target so readers never see a half-written file.
    pub async fn save(&self, snapshot: &FeedSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating cache dir {}", dir.display()))?;
        }

        let body = serde_json::to_vec_pretty(&snapshot.events).context("serialize snapshot")?;
        let tmp = self.tmp_path();
        fs::write(&tmp, &body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        // the file's mtime is the snapshot's age on the next load
        fs::OpenOptions::new()
            .write(true)
            .open(&tmp)
            .await
            .with_context(|| format!("opening {}", tmp.display()))?
            .into_std()
            .await
            .set_modified(snapshot.fetched_at.into())
            .with_context(|| format!("stamping {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub(crate) fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cache".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn week_start(day: NaiveDate) -> NaiveDate {
    window_bounds(Window::CurrentWeek, day).map_or(day, |(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::types::Impact;
    use chrono::{DateTime, TimeZone};

    fn sample() -> FeedSnapshot {
        let ev = EconomicEvent {
            title: "CPI m/m".into(),
            country: "USD".into(),
            date: DateTime::parse_from_rfc3339("2025-09-10T08:30:00-04:00").unwrap(),
            impact: Impact::High,
            forecast: Some("0.3%".into()),
            previous: None,
        };
        FeedSnapshot::new(vec![ev], Utc::now())
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("nope.json"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("cache.json");
        std::fs::write(&p, b"{ not json").unwrap();
        let store = FeedCacheStore::new(&p);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("cache.json"));
        store.save(&sample()).await.unwrap();
        assert!(store.path().exists());
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn stale_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("cache.json")).with_max_age_secs(3600);
        store.save(&sample()).await.unwrap();

        assert!(store.load().await.is_some());
        let later = Utc::now() + ChronoDuration::hours(2);
        assert!(store.load_at(later).await.is_none());
    }

    #[tokio::test]
    async fn zero_max_age_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("cache.json"));
        store.save(&sample()).await.unwrap();
        let much_later = Utc::now() + ChronoDuration::days(400);
        assert!(store.load_at(much_later).await.is_some());
    }

    #[tokio::test]
    async fn load_returns_the_saved_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("cache.json"));
        let snap = sample();
        store.save(&snap).await.unwrap();
        assert_eq!(store.load().await.unwrap(), snap);
    }

    #[tokio::test]
    async fn previous_week_snapshot_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedCacheStore::new(dir.path().join("cache.json"))
            .with_week_tz(chrono_tz::America::New_York);

        // Thursday 2025-09-11, 06:10 New York
        let thursday = Utc.with_ymd_and_hms(2025, 9, 11, 10, 10, 0).unwrap();
        let snap = FeedSnapshot::new(sample().events, thursday);
        store.save(&snap).await.unwrap();

        let saturday_night = Utc.with_ymd_and_hms(2025, 9, 14, 3, 59, 0).unwrap(); // Sat 23:59 EDT
        assert_eq!(store.load_at(saturday_night).await, Some(snap));

        let sunday = Utc.with_ymd_and_hms(2025, 9, 14, 4, 0, 0).unwrap(); // Sun 00:00 EDT
        assert!(store.load_at(sunday).await.is_none());
        let monday = thursday + ChronoDuration::days(4);
        assert!(store.load_at(monday).await.is_none());
    }
}
