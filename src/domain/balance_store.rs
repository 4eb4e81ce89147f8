//! Forward-filled daily balance series.
//!
//! A series stores the cumulative balance at each date where it changed;
//! every later date reads the last change at or before it. Applying a delta
//! on date D rewrites all change points after D, so a late-arriving
//! historical transaction shows up on every day from D to the horizon.
//!
//! The horizon is the latest "today" seen by any update. Dates past it are
//! outside the filled range and read as absent.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::domain::category::{BalanceCategory, BalanceKey};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    /// Add `delta` to every date from `date` onwards.
    pub fn apply(&mut self, date: NaiveDate, delta: f64) {
        let carried = self.value_at(date).unwrap_or(0.0);
        self.points.entry(date).or_insert(carried);
        for value in self.points.range_mut(date..).map(|(_, v)| v) {
            *value += delta;
        }
    }

    /// Balance in effect on `date`, or `None` before the first change.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.points.range(..=date).next_back().map(|(_, v)| *v)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    /// Dates on which the balance changed, with the balance from then on.
    pub fn change_points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DailyBalanceStore {
    series: HashMap<BalanceCategory, BTreeMap<BalanceKey, DailySeries>>,
    horizon: Option<NaiveDate>,
}

impl DailyBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last date covered by the forward fill.
    pub fn horizon(&self) -> Option<NaiveDate> {
        self.horizon
    }

    /// Extend the forward-filled range through `today`.
    pub fn advance_horizon(&mut self, today: NaiveDate) {
        self.horizon = Some(self.horizon.map_or(today, |h| h.max(today)));
    }

    /// Forward-fill `delta` into the series from `date` through the horizon.
    /// A future-dated delta pushes the horizon out to its own date.
    pub fn update(
        &mut self,
        category: BalanceCategory,
        key: BalanceKey,
        date: NaiveDate,
        delta: f64,
        today: NaiveDate,
    ) {
        debug_assert!(key.fits(category), "{key} is not a {category} key");
        self.advance_horizon(today.max(date));
        self.series
            .entry(category)
            .or_default()
            .entry(key)
            .or_default()
            .apply(date, delta);
    }

    /// Balance of one series on `date`, or `None` when the date precedes
    /// the series or lies past the horizon.
    pub fn value_at(
        &self,
        category: BalanceCategory,
        key: &BalanceKey,
        date: NaiveDate,
    ) -> Option<f64> {
        if self.horizon.is_none_or(|h| date > h) {
            return None;
        }
        self.series.get(&category)?.get(key)?.value_at(date)
    }

    pub fn query_point(&self, category: BalanceCategory, key: &BalanceKey, date: NaiveDate) -> f64 {
        self.value_at(category, key, date).unwrap_or(0.0)
    }

    /// Every series with a value on `date`, in key order.
    pub fn values_on(
        &self,
        category: BalanceCategory,
        date: NaiveDate,
    ) -> impl Iterator<Item = (&BalanceKey, f64)> + '_ {
        let in_range = self.horizon.is_some_and(|h| date <= h);
        self.series
            .get(&category)
            .into_iter()
            .flat_map(|keyed| keyed.iter())
            .filter(move |_| in_range)
            .filter_map(move |(key, series)| series.value_at(date).map(|v| (key, v)))
    }

    pub fn keys(&self, category: BalanceCategory) -> impl Iterator<Item = &BalanceKey> + '_ {
        self.series
            .get(&category)
            .into_iter()
            .flat_map(|keyed| keyed.keys())
    }
}
