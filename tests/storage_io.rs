use bls_rs::models::Footnote;
use bls_rs::{Error, Observation, storage};
use std::fs;
use tempfile::tempdir;

fn sample(n: usize) -> Vec<Observation> {
    (0..n)
        .map(|i| Observation {
            series_id: "CUUR0000SA0".into(),
            year: 2016 - i as i32,
            period: "A01".into(),
            period_name: "Annual".into(),
            value: if i == 1 { None } else { Some(100.0 + i as f64) },
            footnotes: vec![],
            latest: i == 0,
        })
        .collect()
}

#[test]
fn save_csv_and_json() {
    let rows = sample(3);
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("obs.csv");
    storage::save_csv(&rows, &csv_path).unwrap();
    let csv_txt = fs::read_to_string(&csv_path).unwrap();
    assert!(csv_txt.starts_with("series_id,year,period,period_name,value,latest,footnotes"));
    assert_eq!(csv_txt.lines().count(), 1 + rows.len());
    // Unavailable value is an empty cell, not zero.
    assert_eq!(
        csv_txt.lines().nth(2).unwrap(),
        "CUUR0000SA0,2015,A01,Annual,,false,"
    );

    let json_path = dir.path().join("obs.json");
    storage::save_json(&rows, &json_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), rows.len());
    assert_eq!(arr[0]["value"], serde_json::json!(100.0));
    assert!(arr[1]["value"].is_null());
}

// Spreadsheet applications execute cells starting with =, +, -, @.
// Text cells that would be evaluated are prefixed with a single quote.
#[test]
fn csv_cells_are_prefixed_to_avoid_formulas() {
    let points = vec![Observation {
        series_id: "=HYPERLINK(\"http://evil\")".into(),
        year: 2020,
        period: "+SUM(A1:A9)".into(),
        period_name: "@foo".into(),
        value: Some(1.0),
        footnotes: vec![Footnote {
            code: None,
            text: Some("-2+3".into()),
        }],
        latest: false,
    }];

    let dir = tempdir().unwrap();
    let path = dir.path().join("csv_injection.csv");
    storage::save_csv(&points, &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let row = rdr.records().next().expect("one data row expected").unwrap();
    let cell = |name: &str| {
        let idx = headers.iter().position(|h| h == name).expect("header present");
        row.get(idx).unwrap().to_string()
    };

    for (name, original) in [
        ("series_id", "=HYPERLINK"),
        ("period", "+SUM"),
        ("period_name", "@foo"),
        ("footnotes", "-2+3"),
    ] {
        let v = cell(name);
        assert!(v.starts_with('\''), "{name} not prefixed: {v}");
        assert!(v.contains(original), "{name} content changed: {v}");
    }
    assert_eq!(cell("value"), "1");
}

#[test]
fn unwritable_path_is_io_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope").join("obs.csv");
    assert!(matches!(
        storage::save_csv(&sample(1), &path),
        Err(Error::IoFailure { .. })
    ));
    assert!(matches!(
        storage::save_json(&sample(1), dir.path().join("nope").join("obs.json")),
        Err(Error::IoFailure { .. })
    ));
}
