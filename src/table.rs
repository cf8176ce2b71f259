//! Reshape observations into a year-ascending table.

use crate::models::{Observation, Period, ResponseEnvelope};
use std::collections::{BTreeMap, BTreeSet};

/// Tabulated values of one series. `None` cells are unavailable values.
///
/// A series with one period per year is indexed by year alone; as soon as
/// any year carries more than one distinct period every entry is indexed by
/// `(year, period)` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Annual(BTreeMap<i32, Option<f64>>),
    Periodic(BTreeMap<(i32, String), Option<f64>>),
}

impl Table {
    pub fn len(&self) -> usize {
        match self {
            Table::Annual(m) => m.len(),
            Table::Periodic(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in key order as `(year, period, value)`; annual rows carry no period.
    pub fn rows(&self) -> Vec<(i32, Option<&str>, Option<f64>)> {
        match self {
            Table::Annual(m) => m.iter().map(|(y, v)| (*y, None, *v)).collect(),
            Table::Periodic(m) => m
                .iter()
                .map(|((y, p), v)| (*y, Some(p.as_str()), *v))
                .collect(),
        }
    }

    /// Numeric values only, in key order.
    pub fn values(&self) -> Vec<f64> {
        self.rows().into_iter().filter_map(|(_, _, v)| v).collect()
    }

    /// Chart coordinates: `(x, value)` where sub-annual periods sit at a
    /// fractional offset inside the year. Annual-average rows of a periodic
    /// table are left out since they summarize the year rather than a point in it.
    pub fn points(&self) -> Vec<(f64, Option<f64>)> {
        match self {
            Table::Annual(m) => m.iter().map(|(y, v)| (*y as f64, *v)).collect(),
            Table::Periodic(m) => m
                .iter()
                .filter_map(|((y, p), v)| {
                    let period = Period::parse(p);
                    (!period.is_annual_summary()).then(|| (*y as f64 + period.fraction(), *v))
                })
                .collect(),
        }
    }
}

/// Tabulate the observations of a single series.
///
/// Duplicate keys keep the first occurrence in input order (the provider
/// lists newest first).
pub fn tabulate(observations: &[Observation]) -> Table {
    let mut periods_per_year: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
    for o in observations {
        periods_per_year
            .entry(o.year)
            .or_default()
            .insert(o.period.as_str());
    }
    let periodic = periods_per_year.values().any(|p| p.len() > 1);

    if periodic {
        let mut m = BTreeMap::new();
        for o in observations {
            m.entry((o.year, o.period.clone())).or_insert(o.value);
        }
        Table::Periodic(m)
    } else {
        let mut m = BTreeMap::new();
        for o in observations {
            m.entry(o.year).or_insert(o.value);
        }
        Table::Annual(m)
    }
}

/// One table per series of an envelope, keyed by series id.
pub fn tabulate_envelope(envelope: &ResponseEnvelope) -> BTreeMap<String, Table> {
    envelope
        .series
        .iter()
        .map(|(id, obs)| (id.clone(), tabulate(obs)))
        .collect()
}
