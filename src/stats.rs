use crate::models::ResponseEnvelope;
use crate::table::{Table, tabulate};
use serde::Serialize;

/// Summary statistics for one series.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub series_id: String,
    pub count: usize,
    /// Observations carrying an unavailable marker.
    pub unavailable: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Earliest and latest numeric values in time order.
    pub first: Option<f64>,
    pub last: Option<f64>,
}

/// Summarize one tabulated series.
pub fn summarize(series_id: &str, table: &Table) -> Summary {
    let rows = table.rows();
    let unavailable = rows.iter().filter(|(_, _, v)| v.is_none()).count();
    let in_order = table.values();
    let first = in_order.first().copied();
    let last = in_order.last().copied();

    let mut vals = in_order;
    vals.sort_by(|a, b| a.total_cmp(b));
    let count = vals.len();
    let min = vals.first().copied();
    let max = vals.last().copied();
    let mean = if count > 0 {
        Some(vals.iter().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary {
        series_id: series_id.to_string(),
        count,
        unavailable,
        min,
        max,
        mean,
        median,
        first,
        last,
    }
}

/// One summary per series of an envelope, ordered by series id.
pub fn series_summary(envelope: &ResponseEnvelope) -> Vec<Summary> {
    envelope
        .series
        .iter()
        .map(|(id, obs)| summarize(id, &tabulate(obs)))
        .collect()
}
