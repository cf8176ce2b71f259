use crate::error::{Error, Result};
use crate::models::Observation;
use csv::WriterBuilder;
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Spreadsheet applications evaluate cells starting with these characters.
fn guard_formula(cell: &str) -> Cow<'_, str> {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => Cow::Owned(format!("'{cell}")),
        _ => Cow::Borrowed(cell),
    }
}

fn csv_err(path: &Path, e: csv::Error) -> Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => Error::io(path, io),
        other => Error::io(path, std::io::Error::other(format!("{other:?}"))),
    }
}

/// Save observations as CSV with header. Unavailable values are empty cells.
pub fn save_csv<P: AsRef<Path>>(points: &[Observation], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    wtr.write_record([
        "series_id",
        "year",
        "period",
        "period_name",
        "value",
        "latest",
        "footnotes",
    ])
    .map_err(|e| csv_err(path, e))?;
    for p in points {
        let footnotes = p
            .footnotes
            .iter()
            .filter_map(|f| f.text.as_deref().or(f.code.as_deref()))
            .collect::<Vec<_>>()
            .join(" | ");
        wtr.write_record([
            &*guard_formula(&p.series_id),
            p.year.to_string().as_str(),
            &*guard_formula(&p.period),
            &*guard_formula(&p.period_name),
            p.value.map(|v| v.to_string()).unwrap_or_default().as_str(),
            if p.latest { "true" } else { "false" },
            &*guard_formula(&footnotes),
        ])
        .map_err(|e| csv_err(path, e))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Save observations as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(points: &[Observation], path: P) -> Result<()> {
    let path = path.as_ref();
    let s = serde_json::to_string_pretty(points)
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?;
    let mut f = File::create(path).map_err(|e| Error::io(path, e))?;
    f.write_all(s.as_bytes()).map_err(|e| Error::io(path, e))?;
    Ok(())
}
