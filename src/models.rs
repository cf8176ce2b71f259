use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Provider placeholders for suppressed or unavailable observations.
pub const UNAVAILABLE_MARKERS: &[&str] = &["-", "(NA)", "(S)", "(X)", "(D)", "(C)"];

static SERIES_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]+$").expect("static regex"));

/// Registration key for the v2 API.
///
/// `Debug` is redacted so the key never ends up in logs or error chains.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AccessKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(***)")
    }
}

fn parse_year(part: &str) -> Result<i32> {
    part.trim()
        .parse::<i32>()
        .map_err(|_| Error::InvalidRequest(format!("non-numeric year {:?}", part.trim())))
}

/// Parse `YYYY` or `YYYY:YYYY` into an inclusive `(start, end)` pair.
pub fn parse_year_range(s: &str) -> Result<(i32, i32)> {
    let (start, end) = match s.split_once(':') {
        Some((a, b)) => (parse_year(a)?, parse_year(b)?),
        None => {
            let y = parse_year(s)?;
            (y, y)
        }
    };
    if start > end {
        return Err(Error::InvalidRequest(format!(
            "start year {start} is after end year {end}"
        )));
    }
    Ok((start, end))
}

/// One data request: which series, which inclusive year span.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub series_ids: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    /// Overrides the key from `ApiConfig` when set.
    pub access_key: Option<AccessKey>,
    /// Ask the provider to append annual averages (v2 only).
    pub annual_average: bool,
}

impl SeriesRequest {
    pub fn new<I, S>(series_ids: I, start_year: i32, end_year: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            series_ids: series_ids.into_iter().map(Into::into).collect(),
            start_year,
            end_year,
            access_key: None,
            annual_average: false,
        }
    }

    /// Like [`SeriesRequest::new`] but with each year given as text (`"2012"`).
    pub fn from_text<I, S>(series_ids: I, start_year: &str, end_year: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(series_ids, parse_year(start_year)?, parse_year(end_year)?))
    }

    pub fn with_access_key(mut self, key: AccessKey) -> Self {
        self.access_key = Some(key);
        self
    }

    pub fn with_annual_average(mut self, on: bool) -> Self {
        self.annual_average = on;
        self
    }

    /// Check the invariants and return the normalized identifiers
    /// (trimmed, upper-cased, first occurrence kept).
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.start_year > self.end_year {
            return Err(Error::InvalidRequest(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        let ids = normalize_series_ids(&self.series_ids)?;
        if ids.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one series id required".into(),
            ));
        }
        Ok(ids)
    }
}

pub(crate) fn normalize_series_ids(raw: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in raw {
        let id = id.trim().to_ascii_uppercase();
        if id.is_empty() {
            continue;
        }
        if !SERIES_ID.is_match(&id) {
            return Err(Error::InvalidRequest(format!("invalid series id {id:?}")));
        }
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    Ok(out)
}

/// Outcome reported in the envelope's `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Succeeded,
    NotProcessed,
    Failed,
    NotSuccessful,
    Other(String),
}

impl RequestStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "REQUEST_SUCCEEDED" => Self::Succeeded,
            "REQUEST_NOT_PROCESSED" => Self::NotProcessed,
            "REQUEST_FAILED" => Self::Failed,
            "REQUEST_NOT_SUCCESSFUL" => Self::NotSuccessful,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Succeeded => "REQUEST_SUCCEEDED",
            Self::NotProcessed => "REQUEST_NOT_PROCESSED",
            Self::Failed => "REQUEST_FAILED",
            Self::NotSuccessful => "REQUEST_NOT_SUCCESSFUL",
            Self::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Typed view of a period code such as `M03`, `Q01` or `A01`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Monthly(u8),
    Quarterly(u8),
    SemiAnnual(u8),
    Annual,
    /// `M13`, `Q05`, `S03`: the provider's annual average rows.
    AnnualAverage,
    Other(String),
}

impl Period {
    pub fn parse(code: &str) -> Self {
        let code = code.trim();
        let mut chars = code.chars();
        let kind = chars.next();
        let n = chars.as_str().parse::<u8>().ok();
        match (kind, n) {
            (Some('M'), Some(13)) | (Some('Q'), Some(5)) | (Some('S'), Some(3)) => {
                Self::AnnualAverage
            }
            (Some('M'), Some(m @ 1..=12)) => Self::Monthly(m),
            (Some('Q'), Some(q @ 1..=4)) => Self::Quarterly(q),
            (Some('S'), Some(s @ 1..=2)) => Self::SemiAnnual(s),
            (Some('A'), Some(1)) => Self::Annual,
            _ => Self::Other(code.to_string()),
        }
    }

    /// Position inside the year in `[0, 1)`, used for the chart's x axis.
    pub fn fraction(&self) -> f64 {
        match *self {
            Self::Monthly(m) => (m - 1) as f64 / 12.0,
            Self::Quarterly(q) => (q - 1) as f64 / 4.0,
            Self::SemiAnnual(s) => (s - 1) as f64 / 2.0,
            _ => 0.0,
        }
    }

    pub fn is_annual_summary(&self) -> bool {
        matches!(self, Self::AnnualAverage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub code: Option<String>,
    pub text: Option<String>,
}

/// One data point of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub period_name: String,
    /// `None` marks a suppressed or unavailable value.
    pub value: Option<f64>,
    pub footnotes: Vec<Footnote>,
    pub latest: bool,
}

impl Observation {
    pub fn period_kind(&self) -> Period {
        Period::parse(&self.period)
    }
}

/// Decoded response of one request/response cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status: RequestStatus,
    pub messages: Vec<String>,
    pub response_time: Option<u64>,
    pub series: BTreeMap<String, Vec<Observation>>,
}

impl ResponseEnvelope {
    /// All observations, series after series, in provider order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.series.values().flatten()
    }
}

// ---------------------------------------------------------------------------
// Wire types. Only the parser touches these.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawHeader {
    status: String,
    #[serde(default)]
    message: Vec<String>,
    #[serde(rename = "responseTime", default)]
    response_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    #[serde(rename = "Results")]
    results: RawResults,
}

#[derive(Debug, Deserialize)]
struct RawResults {
    series: Vec<RawSeries>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(rename = "seriesID")]
    series_id: String,
    #[serde(default)]
    data: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(deserialize_with = "de_string_from_string_or_number")]
    year: String,
    period: String,
    #[serde(rename = "periodName", default)]
    period_name: String,
    #[serde(deserialize_with = "de_string_from_string_or_number")]
    value: String,
    #[serde(default)]
    footnotes: Vec<Option<Footnote>>,
    #[serde(default)]
    latest: Option<String>,
}

/// Serde helper: accept a JSON string or number and keep its text.
/// Some compatible services send `year`/`value` as numbers.
fn de_string_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<String, E> {
            Ok(s.to_string())
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

fn parse_value(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let s = raw.trim();
    if UNAVAILABLE_MARKERS.contains(&s) {
        return Ok(None);
    }
    // Rust's f64 parser accepts "NaN" and "inf"; the provider never means those.
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(()),
    }
}

/// Decode a raw response body into a [`ResponseEnvelope`].
///
/// The status is checked before `Results` is required, so a failed request
/// surfaces the provider's messages rather than a missing-field error.
pub fn parse_envelope(raw: impl AsRef<[u8]>) -> Result<ResponseEnvelope> {
    let raw = raw.as_ref();
    let header: RawHeader =
        serde_json::from_slice(raw).map_err(|e| Error::MalformedResponse(e.to_string()))?;
    let status = RequestStatus::from_code(&header.status);
    if !status.is_success() {
        return Err(Error::RemoteRequestFailed {
            status: header.status,
            messages: header.message,
        });
    }

    let body: RawBody =
        serde_json::from_slice(raw).map_err(|e| Error::MalformedResponse(e.to_string()))?;

    let mut series: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for raw_series in body.results.series {
        let id = raw_series.series_id;
        let mut out = Vec::with_capacity(raw_series.data.len());
        for entry in raw_series.data {
            let year = entry.year.trim().parse::<i32>().map_err(|_| {
                Error::MalformedResponse(format!("non-numeric year {:?} in {id}", entry.year))
            })?;
            let value = parse_value(&entry.value).map_err(|_| Error::InvalidValue {
                series_id: id.clone(),
                year,
                period: entry.period.clone(),
                value: entry.value.clone(),
            })?;
            if value.is_none() {
                log::debug!("{id} {year} {}: value unavailable ({:?})", entry.period, entry.value);
            }
            let footnotes = entry
                .footnotes
                .into_iter()
                .flatten()
                .filter(|f| f.code.is_some() || f.text.is_some())
                .collect();
            out.push(Observation {
                series_id: id.clone(),
                year,
                period: entry.period,
                period_name: entry.period_name,
                value,
                footnotes,
                latest: entry.latest.as_deref() == Some("true"),
            });
        }
        series.entry(id).or_default().extend(out);
    }

    Ok(ResponseEnvelope {
        status,
        messages: header.message,
        response_time: header.response_time,
        series,
    })
}
