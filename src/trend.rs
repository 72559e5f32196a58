//! Trailing-average and year-to-date values for the metric table.
//!
//! [`RecordedTrends`] only ever shows what the dataset carries.
//! [`SynthesizedTrends`] fills absent cells with presentation filler derived
//! from the current value and two per-key fractions held in a [`SeedCache`].
//! Filler is flagged `synthetic` all the way to the renderer and is never
//! measured data.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;

use crate::records::MetricRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedSlot {
    Trailing,
    YearToDate,
}

/// Session-scoped fractions in [0, 1), generated once per
/// (metric, organization, slot) and never regenerated.
#[derive(Debug)]
pub struct SeedCache {
    seeds: HashMap<(String, String, SeedSlot), f64>,
    rng: StdRng,
}

impl SeedCache {
    pub fn new() -> Self {
        Self {
            seeds: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible cache for tests and snapshot rendering.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seeds: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn fraction(&mut self, metric_name: &str, organization: &str, slot: SeedSlot) -> f64 {
        let rng = &mut self.rng;
        *self
            .seeds
            .entry((metric_name.to_string(), organization.to_string(), slot))
            .or_insert_with(|| rng.gen::<f64>())
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

impl Default for SeedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Trends {
    pub trailing: Option<f64>,
    pub year_to_date: Option<f64>,
    /// At least one of the two values is filler.
    pub synthetic: bool,
}

pub trait TrendSource: Send + Sync {
    fn trends(&self, record: &MetricRecord, cache: &mut SeedCache) -> Trends;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedTrends;

impl TrendSource for RecordedTrends {
    fn trends(&self, record: &MetricRecord, _cache: &mut SeedCache) -> Trends {
        Trends {
            trailing: record.trailing_average.number(),
            year_to_date: record.year_to_date_average.number(),
            synthetic: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesizedTrends {
    pub trailing_spread: f64,
    pub year_to_date_spread: f64,
}

impl Default for SynthesizedTrends {
    fn default() -> Self {
        Self {
            trailing_spread: 15.0,
            year_to_date_spread: 10.0,
        }
    }
}

impl TrendSource for SynthesizedTrends {
    fn trends(&self, record: &MetricRecord, cache: &mut SeedCache) -> Trends {
        let mut trends = RecordedTrends.trends(record, cache);
        let Some(current) = record.current_value.number() else {
            return trends;
        };
        let metric = record.metric_name.as_str();
        let org = record.organization.trim();

        if record.trailing_average.is_missing() {
            let f = cache.fraction(metric, org, SeedSlot::Trailing);
            trends.trailing = Some(current + (f * 2.0 - 1.0) * self.trailing_spread);
            trends.synthetic = true;
        }
        if record.year_to_date_average.is_missing() {
            let f = cache.fraction(metric, org, SeedSlot::YearToDate);
            trends.year_to_date = Some(current - (f * 2.0 - 1.0) * self.year_to_date_spread);
            trends.synthetic = true;
        }
        trends
    }
}

pub fn trend_source(synthesize: bool) -> Box<dyn TrendSource> {
    if synthesize {
        Box::new(SynthesizedTrends::default())
    } else {
        Box::new(RecordedTrends)
    }
}
