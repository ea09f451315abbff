//! The running session: settings loaded at startup, mutated while the
//! program runs, and flushed back to the active store on exit.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::core::calendar::day_label;
use crate::core::chart::{self, BoundsOverride};
use crate::core::config::AppConfig;
use crate::core::gap_fill::{fill_gaps, recorded_days};
use crate::core::models::history::{ChartData, DailySample};
use crate::core::models::projection::Projection;
use crate::core::projector::{project_at, ProjectionError, RoundingPolicy};
use crate::core::store::{self, SettingsKeys, SettingsStore, StoreError, StoreKind};

/// A value plus the one it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tracked<T: Copy> {
    pub current: T,
    pub previous: T,
}

impl<T: Copy> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            previous: value,
        }
    }

    pub fn set(&mut self, value: T) {
        self.previous = self.current;
        self.current = value;
    }
}

/// The scalar values persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    pub current_used: f64,
    pub per_day_remaining: Option<f64>,
    /// Highest day of month with a recorded sample
    pub last_day: Option<u32>,
    pub month_of_year: Option<u32>,
    pub chart_min: Option<f64>,
    pub chart_max: Option<f64>,
}

impl SettingsSnapshot {
    fn from_entries(keys: &SettingsKeys, entries: &BTreeMap<String, String>) -> Self {
        let number = |key: String| -> Option<f64> {
            let raw = entries.get(&key)?;
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    tracing::warn!(%key, value = %raw, "ignoring unreadable stored value");
                    None
                }
            }
        };

        Self {
            current_used: number(keys.current_used()).unwrap_or(0.0),
            per_day_remaining: number(keys.per_day_remaining()),
            last_day: None,
            month_of_year: number(keys.month_of_year())
                .filter(|m| m.fract() == 0.0 && (1.0..=12.0).contains(m))
                .map(|m| m as u32),
            chart_min: number(keys.chart_min()),
            chart_max: number(keys.chart_max()),
        }
    }
}

/// Per-day history keyed by "DD", taken from the full entry set.
fn history_from_entries(
    keys: &SettingsKeys,
    entries: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let prefix = keys.day_prefix();
    entries
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|day| (day.to_string(), v.clone())))
        .collect()
}

/// Highest numeric day label present.
fn latest_day(history: &BTreeMap<String, String>) -> Option<u32> {
    history
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .max()
}

/// What a flush wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlushSummary {
    pub samples: Vec<DailySample>,
    pub bounds_written: bool,
}

impl FlushSummary {
    pub fn interpolated(&self) -> usize {
        self.samples.iter().filter(|s| s.interpolated).count()
    }
}

#[derive(Debug)]
pub struct Session {
    store: Box<dyn SettingsStore>,
    keys: SettingsKeys,
    snapshot: SettingsSnapshot,
    history: BTreeMap<String, String>,
    used: Tracked<f64>,
    projection: Option<Projection>,
    /// Month the loaded history belongs to
    history_month: Option<u32>,
    today: NaiveDate,
    rolled_over: bool,
}

impl Session {
    /// Pick a backend, load the session from it, and fall back to the local
    /// store if the networked one cannot be read. Returns any user notices.
    pub async fn open(
        config: &AppConfig,
        today: NaiveDate,
    ) -> Result<(Self, Vec<String>), StoreError> {
        let mut notices = Vec::new();
        let selection = store::select_backend(&config.store).await?;
        notices.extend(selection.notice);

        if selection.store.kind() == StoreKind::Local {
            let session = Self::load(selection.store, &config.store.base_key, today).await?;
            return Ok((session, notices));
        }

        let location = selection.store.location();
        match Self::load(selection.store, &config.store.base_key, today).await {
            Ok(session) => Ok((session, notices)),
            Err(e) => {
                let notice = format!(
                    "Cannot read settings from {} ({}). Possible authentication failure, using local fallback.",
                    location, e
                );
                tracing::warn!("{}", notice);
                notices.push(notice);
                let local = store::open_local(&config.store)?;
                let session = Self::load(Box::new(local), &config.store.base_key, today).await?;
                Ok((session, notices))
            }
        }
    }

    /// Read every setting under `base_key`. History from another month is purged.
    pub async fn load(
        store: Box<dyn SettingsStore>,
        base_key: &str,
        today: NaiveDate,
    ) -> Result<Self, StoreError> {
        let keys = SettingsKeys::new(base_key);
        let entries = store.get_prefix(&keys.all()).await?;
        let mut snapshot = SettingsSnapshot::from_entries(&keys, &entries);
        let history = history_from_entries(&keys, &entries);
        snapshot.last_day = latest_day(&history);

        let mut session = Self {
            store,
            keys,
            used: Tracked::new(snapshot.current_used),
            history_month: snapshot.month_of_year,
            snapshot,
            history,
            projection: None,
            today,
            rolled_over: false,
        };
        session.roll_over_if_needed().await?;
        Ok(session)
    }

    /// Delete daily history recorded in a month other than today's.
    async fn roll_over_if_needed(&mut self) -> Result<(), StoreError> {
        let month = self.today.month();
        if self.history_month != Some(month) && !self.history.is_empty() {
            tracing::info!(
                stored_month = ?self.history_month,
                month,
                days = self.history.len(),
                "new month, deleting daily history"
            );
            for day in self.history.keys() {
                self.store.delete(&self.keys.day(day)).await?;
            }
            self.history.clear();
            self.snapshot.last_day = None;
            self.rolled_over = true;
        }
        self.history_month = Some(month);
        Ok(())
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    /// True when last month's history was deleted, at load or on a flush
    /// after midnight ending the month.
    pub fn rolled_over(&self) -> bool {
        self.rolled_over
    }

    pub fn used(&self) -> Tracked<f64> {
        self.used
    }

    pub fn set_used(&mut self, used_gb: f64) {
        self.used.set(used_gb);
        self.snapshot.current_used = used_gb;
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Recompute the projection for the current usage at `now`. The next
    /// flush records the result under `now`'s day.
    pub fn recompute(
        &mut self,
        total_gb: f64,
        now: &NaiveDateTime,
        rounding: RoundingPolicy,
    ) -> Result<&Projection, ProjectionError> {
        self.today = now.date();
        match project_at(total_gb, self.used.current, now, rounding) {
            Ok(p) => {
                self.snapshot.per_day_remaining = Some(p.gb_per_day_remaining);
                Ok(self.projection.insert(p))
            }
            Err(e) => {
                self.projection = None;
                Err(e)
            }
        }
    }

    /// The persisted y-axis override.
    pub fn stored_bounds(&self) -> BoundsOverride {
        BoundsOverride {
            min: self.snapshot.chart_min,
            max: self.snapshot.chart_max,
        }
    }

    /// Chart view of the history, applying `requested` over the stored bounds.
    pub fn chart(&self, requested: BoundsOverride) -> ChartData {
        let stored = self.stored_bounds();
        let effective = BoundsOverride {
            min: requested.min.or(stored.min),
            max: requested.max.or(stored.max),
        };
        chart::prepare(&self.history, effective)
    }

    /// Resolve and remember chart bounds; they are written on the next flush.
    pub fn set_chart_bounds(&mut self, requested: BoundsOverride) -> ChartData {
        let data = self.chart(requested);
        self.snapshot.chart_min = Some(data.bounds.min);
        self.snapshot.chart_max = Some(data.bounds.max);
        data
    }

    /// Write the session back to the store.
    ///
    /// With a projection available, today's per-day value is recorded (plus
    /// interpolated values for missed days when `fill_missing_days` is set).
    pub async fn flush(&mut self, fill_missing_days: bool) -> Result<FlushSummary, StoreError> {
        let mut summary = FlushSummary::default();
        self.roll_over_if_needed().await?;

        if let Some(p) = &self.projection {
            let today = self.today.day();
            let per_day = p.gb_per_day_remaining;
            summary.samples = if fill_missing_days {
                let recorded = recorded_days(&self.history);
                fill_gaps(&recorded, today, per_day)
            } else {
                vec![DailySample {
                    day: today,
                    value: per_day,
                    interpolated: false,
                }]
            };

            for sample in &summary.samples {
                let label = sample.label();
                let value = format!("{:.3}", sample.value);
                self.store.put(&self.keys.day(&label), &value).await?;
                self.history.insert(label, value);
            }
            self.store
                .put(&self.keys.per_day_remaining(), &format!("{:.3}", per_day))
                .await?;
            self.snapshot.last_day = latest_day(&self.history);
        }

        self.store
            .put(&self.keys.current_used(), &self.used.current.to_string())
            .await?;
        self.store
            .put(&self.keys.month_of_year(), &self.today.month().to_string())
            .await?;
        self.snapshot.month_of_year = Some(self.today.month());

        if self.snapshot.chart_min.is_some() || self.snapshot.chart_max.is_some() {
            // keep persisted bounds valid against any new samples
            let bounds = self.chart(BoundsOverride::default()).bounds;
            self.store
                .put(&self.keys.chart_min(), &format!("{:.3}", bounds.min))
                .await?;
            self.store
                .put(&self.keys.chart_max(), &format!("{:.3}", bounds.max))
                .await?;
            self.snapshot.chart_min = Some(bounds.min);
            self.snapshot.chart_max = Some(bounds.max);
            summary.bounds_written = true;
        }

        tracing::debug!(
            location = %self.store.location(),
            samples = summary.samples.len(),
            "flushed session"
        );
        Ok(summary)
    }

    /// Delete the most recent day of history. Returns its label, if any.
    pub async fn delete_latest_day(&mut self) -> Result<Option<String>, StoreError> {
        let Some(day) = latest_day(&self.history) else {
            return Ok(None);
        };
        let label = day_label(day);
        self.store.delete(&self.keys.day(&label)).await?;
        self.history.remove(&label);
        self.snapshot.last_day = latest_day(&self.history);
        Ok(Some(label))
    }
}
