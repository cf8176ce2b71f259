use bls_rs::models::{Footnote, RequestStatus};
use bls_rs::{Error, Table, parse_envelope, tabulate};

const CPI_ANNUAL: &str = include_str!("fixtures/cpi_annual.json");
const MONTHLY: &str = include_str!("fixtures/unemployment_monthly.json");

#[test]
fn parse_single_annual_observation() {
    let sample = r#"{"Results":{"series":[{"seriesID":"X","data":[{"year":"2016","period":"A01","periodName":"Annual","value":"2156","footnotes":[{}]}]}]},"message":[],"responseTime":52,"status":"REQUEST_SUCCEEDED"}"#;

    let env = parse_envelope(sample).unwrap();
    assert_eq!(env.status, RequestStatus::Succeeded);
    assert_eq!(env.response_time, Some(52));
    let obs: Vec<_> = env.observations().collect();
    assert_eq!(obs.len(), 1);
    assert_eq!(obs[0].series_id, "X");
    assert_eq!(obs[0].year, 2016);
    assert_eq!(obs[0].period, "A01");
    assert_eq!(obs[0].period_name, "Annual");
    assert_eq!(obs[0].value, Some(2156.0));
    assert!(obs[0].footnotes.is_empty());
}

#[test]
fn non_success_status_carries_messages_verbatim() {
    let sample = r#"{
        "status": "REQUEST_NOT_SUCCESSFUL",
        "responseTime": 12,
        "message": ["Invalid Series ID: FOO", "Year range has been reduced to the system limit of 20 years."],
        "Results": {}
    }"#;
    match parse_envelope(sample) {
        Err(Error::RemoteRequestFailed { status, messages }) => {
            assert_eq!(status, "REQUEST_NOT_SUCCESSFUL");
            assert_eq!(
                messages,
                vec![
                    "Invalid Series ID: FOO".to_string(),
                    "Year range has been reduced to the system limit of 20 years.".to_string()
                ]
            );
        }
        other => panic!("expected RemoteRequestFailed, got {other:?}"),
    }
}

#[test]
fn not_processed_without_results_is_remote_failure() {
    let sample = r#"{"status":"REQUEST_NOT_PROCESSED","message":["daily threshold reached"]}"#;
    assert!(matches!(
        parse_envelope(sample),
        Err(Error::RemoteRequestFailed { .. })
    ));
}

#[test]
fn malformed_input_is_always_malformed_response() {
    let truncated = &CPI_ANNUAL[..CPI_ANNUAL.len() / 2];
    let inputs: Vec<&[u8]> = vec![
        b"",
        b"not json",
        b"\xff\xfe\x00",
        b"[]",
        b"{}",
        b"null",
        truncated.as_bytes(),
        br#"{"status":"REQUEST_SUCCEEDED","message":[]}"#,
        br#"{"status":"REQUEST_SUCCEEDED","Results":{}}"#,
        br#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"data":[]}]}}"#,
        br#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"seriesID":"X","data":[{"year":"20x6","period":"A01","value":"1"}]}]}}"#,
    ];
    for raw in inputs {
        match parse_envelope(raw) {
            Err(Error::MalformedResponse(_)) => {}
            other => panic!(
                "expected MalformedResponse for {:?}, got {other:?}",
                String::from_utf8_lossy(raw)
            ),
        }
    }
}

#[test]
fn non_numeric_value_is_invalid_value() {
    let sample = r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"seriesID":"X","data":[{"year":"2016","period":"M01","value":"12..5"}]}]}}"#;
    match parse_envelope(sample) {
        Err(Error::InvalidValue {
            series_id,
            year,
            period,
            value,
        }) => {
            assert_eq!(series_id, "X");
            assert_eq!(year, 2016);
            assert_eq!(period, "M01");
            assert_eq!(value, "12..5");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn unavailable_markers_footnotes_and_latest() {
    let env = parse_envelope(MONTHLY).unwrap();
    assert_eq!(
        env.messages,
        vec!["No Data Available for Series LNS14000000 Year: 2021".to_string()]
    );
    let lns = &env.series["LNS14000000"];
    assert_eq!(lns.len(), 4);
    // Provider order is kept.
    let periods: Vec<_> = lns.iter().map(|o| o.period.as_str()).collect();
    assert_eq!(periods, vec!["M03", "M02", "M01", "M12"]);
    assert!(lns[0].latest);
    assert!(!lns[1].latest);
    assert_eq!(lns[1].value, None);
    assert_eq!(
        lns[1].footnotes,
        vec![Footnote {
            code: Some("X".into()),
            text: Some("Data unavailable".into())
        }]
    );
    assert!(lns[3].footnotes.is_empty());
    assert_eq!(env.series["CES0000000001"][0].value, Some(151090.0));
}

#[test]
fn numeric_json_values_are_accepted() {
    let sample = r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"seriesID":"X","data":[{"year":2016,"period":"A01","value":2.5}]}]}}"#;
    let env = parse_envelope(sample).unwrap();
    let o = env.observations().next().unwrap();
    assert_eq!((o.year, o.value), (2016, Some(2.5)));
}

#[test]
fn fixture_tabulates_year_ascending() {
    let env = parse_envelope(CPI_ANNUAL).unwrap();
    let table = tabulate(&env.series["CUUR0000SA0"]);
    let Table::Annual(m) = &table else {
        panic!("expected annual table, got {table:?}");
    };
    let got: Vec<_> = m.iter().map(|(y, v)| (*y, v.unwrap())).collect();
    assert_eq!(
        got,
        vec![
            (2012, 1677.0),
            (2013, 1790.0),
            (2014, 1868.0),
            (2015, 1930.0),
            (2016, 2156.0)
        ]
    );
    assert_eq!(table, tabulate(&env.series["CUUR0000SA0"]));
}

#[test]
fn monthly_fixture_is_periodic() {
    let env = parse_envelope(MONTHLY).unwrap();
    let table = tabulate(&env.series["LNS14000000"]);
    assert!(matches!(table, Table::Periodic(_)));
    let rows = table.rows();
    assert_eq!(rows.first().copied(), Some((2019, Some("M12"), Some(3.6))));
    assert_eq!(rows.last().copied(), Some((2020, Some("M03"), Some(4.4))));
}
