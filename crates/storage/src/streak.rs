//! Consecutive-day play streak

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use log::{debug, warn};

use crate::{KeyValueStore, StorageKeys, StorageResult};

/// Tracks how many calendar days in a row the player has voted.
///
/// Days are supplied by the caller so the tracker stays independent of the
/// device clock and time zone.
pub struct StreakTracker {
    store: Arc<dyn KeyValueStore>,
    streak: u32,
    last_play: Option<NaiveDate>,
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// `last` is today or the day before
fn is_current(last: NaiveDate, today: NaiveDate) -> bool {
    last == today || last.succ_opt() == Some(today)
}

impl StreakTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            streak: 0,
            last_play: None,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn last_play(&self) -> Option<NaiveDate> {
        self.last_play
    }

    /// Load the persisted streak, resetting it if a day was skipped
    pub async fn load(&mut self, today: NaiveDate) -> StorageResult<u32> {
        let stored_streak = self.store.get(StorageKeys::STREAK).await?;
        let stored_last = self.store.get(StorageKeys::LAST_PLAY).await?;

        self.last_play = stored_last.as_deref().and_then(|raw| {
            let day = parse_day(raw);
            if day.is_none() {
                warn!("Ignoring unreadable last play date {:?}", raw);
            }
            day
        });

        self.streak = match stored_streak {
            Some(raw) => raw.trim().parse().unwrap_or(0),
            None => 0,
        };

        if let Some(last) = self.last_play {
            if self.streak > 0 && !is_current(last, today) {
                debug!("Streak broken, last play was {}", last);
                self.streak = 0;
                self.store.set(StorageKeys::STREAK, "0").await?;
            }
        }

        Ok(self.streak)
    }

    /// Count a play on `today`. Playing twice on the same day does not
    /// extend the streak.
    pub async fn record_play(&mut self, today: NaiveDate) -> StorageResult<u32> {
        if self.last_play == Some(today) {
            return Ok(self.streak);
        }

        let next = match self.last_play {
            Some(last) if is_current(last, today) => self.streak.saturating_add(1),
            Some(_) => 1,
            None => self.streak.saturating_add(1),
        };

        self.store
            .set(StorageKeys::STREAK, &next.to_string())
            .await?;
        self.store
            .set(StorageKeys::LAST_PLAY, &today.format("%Y-%m-%d").to_string())
            .await?;

        self.streak = next;
        self.last_play = Some(today);
        Ok(next)
    }
}
