//! Synchronous client for the **BLS Public Data API** (`v1` and `v2`).
//!
//! Building a request is a pure step ([`build_request`]); executing it is a
//! single blocking round trip ([`Client::execute`]) followed by
//! [`crate::models::parse_envelope`].
//!
//! ### Notes
//! - `v2` requires a registration key, passed as the `registrationkey` query
//!   parameter. The key is never logged: use [`HttpRequest::redacted_url`].
//! - Nothing is retried. A failed attempt ends the operation.
//! - The total timeout defaults to 30s (see [`ApiConfig::timeout`]).
//!
//! Typical usage:
//! ```no_run
//! # use bls_rs::{Client, SeriesRequest};
//! # use bls_rs::config::ApiConfig;
//! let client = Client::new(ApiConfig::default())?;
//! let env = client.fetch(&SeriesRequest::new(["CUUR0000SA0"], 2012, 2016))?;
//! # Ok::<(), bls_rs::Error>(())
//! ```

use crate::config::{ApiConfig, ApiVersion};
use crate::error::{Error, Result};
use crate::models::{ResponseEnvelope, SeriesRequest, normalize_series_ids, parse_envelope};
use percent_encoding::NON_ALPHANUMERIC;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::Serialize;
use std::fmt;

pub const CONTENT_TYPE_JSON: &str = "application/json";
const KEY_PARAM: &str = "registrationkey";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// JSON body of a data request. Years travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    pub seriesid: Vec<String>,
    pub startyear: String,
    pub endyear: String,
    #[serde(skip_serializing_if = "is_false")]
    pub annualaverage: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Description of one HTTP request; nothing has been sent yet.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// The URL with the access key replaced by `***`.
    pub fn redacted_url(&self) -> String {
        let marker = format!("{KEY_PARAM}=");
        match self.url.find(&marker) {
            Some(pos) => {
                let start = pos + marker.len();
                let end = self.url[start..]
                    .find('&')
                    .map(|i| start + i)
                    .unwrap_or(self.url.len());
                format!("{}***{}", &self.url[..start], &self.url[end..])
            }
            None => self.url.clone(),
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

fn data_url(config: &ApiConfig, version: ApiVersion) -> String {
    format!(
        "{}/{}/timeseries/data/",
        config.base_url.trim_end_matches('/'),
        version.as_path()
    )
}

/// Turn a [`SeriesRequest`] into an [`HttpRequest`] for the configured API version.
///
/// ### Errors
/// [`Error::InvalidRequest`] when the series list is empty or malformed, the
/// years are reversed, or a `v2` request has no access key.
pub fn build_request(config: &ApiConfig, req: &SeriesRequest) -> Result<HttpRequest> {
    let seriesid = req.validate()?;
    let mut url = data_url(config, config.version);

    if config.version == ApiVersion::V2 {
        let key = req
            .access_key
            .as_ref()
            .or(config.access_key.as_ref())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::InvalidRequest("v2 requests need an access key (set BLS_API_KEY)".into())
            })?;
        url.push_str(&format!(
            "?{KEY_PARAM}={}",
            percent_encoding::utf8_percent_encode(key.expose(), NON_ALPHANUMERIC)
        ));
    } else if req.annual_average {
        log::warn!("annual averages are only available from v2; flag ignored");
    }

    let body = RequestBody {
        seriesid,
        startyear: req.start_year.to_string(),
        endyear: req.end_year.to_string(),
        annualaverage: req.annual_average && config.version == ApiVersion::V2,
    };
    let body = serde_json::to_string(&body).map_err(|e| Error::InvalidRequest(e.to_string()))?;

    Ok(HttpRequest {
        method: Method::Post,
        url,
        headers: vec![("Content-Type", CONTENT_TYPE_JSON.to_string())],
        body: Some(body),
    })
}

/// Unauthenticated `v1` GET for one series over the provider's default years.
pub fn build_latest_request(config: &ApiConfig, series_id: &str) -> Result<HttpRequest> {
    let id = normalize_series_ids(&[series_id.to_string()])?
        .pop()
        .ok_or_else(|| Error::InvalidRequest("series id required".into()))?;
    Ok(HttpRequest {
        method: Method::Get,
        url: format!("{}{}", data_url(config, ApiVersion::V1), id),
        headers: Vec::new(),
        body: None,
    })
}

#[derive(Debug, Clone)]
pub struct Client {
    config: ApiConfig,
    http: HttpClient,
}

impl Client {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout()) // total request timeout
            .connect_timeout(config.connect_timeout())
            .redirect(Policy::limited(5))
            .user_agent(concat!("bls_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkFailure(e.without_url()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Build, send and parse one data request.
    pub fn fetch(&self, req: &SeriesRequest) -> Result<ResponseEnvelope> {
        let request = build_request(&self.config, req)?;
        self.execute(&request)
    }

    pub fn fetch_latest(&self, series_id: &str) -> Result<ResponseEnvelope> {
        let request = build_latest_request(&self.config, series_id)?;
        self.execute(&request)
    }

    /// Send a prepared request once and decode the response.
    pub fn execute(&self, request: &HttpRequest) -> Result<ResponseEnvelope> {
        log::debug!("{:?} {}", request.method, request.redacted_url());
        let mut rb = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        for (name, value) in &request.headers {
            rb = rb.header(*name, value);
        }
        if let Some(body) = &request.body {
            rb = rb.body(body.clone());
        }

        let resp = rb.send().map_err(|e| self.classify(e))?;
        let status = resp.status();
        let bytes = resp.bytes().map_err(|e| self.classify(e))?;
        log::debug!("HTTP {} ({} bytes)", status, bytes.len());

        if !status.is_success() {
            // Some gateways still answer with a provider envelope; prefer its messages.
            return match parse_envelope(&bytes) {
                Err(e @ Error::RemoteRequestFailed { .. }) => Err(e),
                _ => Err(Error::HttpStatus {
                    status: status.as_u16(),
                }),
            };
        }

        let envelope = parse_envelope(&bytes)?;
        for msg in &envelope.messages {
            log::warn!("provider: {msg}");
        }
        log::debug!(
            "{} series, {} observations",
            envelope.series.len(),
            envelope.observations().count()
        );
        Ok(envelope)
    }

    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.config.timeout())
        } else {
            // The URL carries the access key.
            Error::NetworkFailure(e.without_url())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessKey;

    fn v2_config() -> ApiConfig {
        ApiConfig {
            access_key: Some(AccessKey::new("k3y/+")),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn v2_request_shape() {
        let req = SeriesRequest::new(["CUUR0000SA0", "SUUR0000SA0"], 2012, 2016);
        let r = build_request(&v2_config(), &req).unwrap();
        assert_eq!(r.method, Method::Post);
        assert_eq!(
            r.url,
            "https://api.bls.gov/publicAPI/v2/timeseries/data/?registrationkey=k3y%2F%2B"
        );
        assert_eq!(r.headers, vec![("Content-Type", "application/json".to_string())]);
        let body: serde_json::Value = serde_json::from_str(r.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "seriesid": ["CUUR0000SA0", "SUUR0000SA0"],
                "startyear": "2012",
                "endyear": "2016"
            })
        );
    }

    #[test]
    fn request_key_overrides_config_key() {
        let req = SeriesRequest::new(["X1"], 2020, 2020).with_access_key(AccessKey::new("mine"));
        let r = build_request(&v2_config(), &req).unwrap();
        assert!(r.url.ends_with("registrationkey=mine"));
    }

    #[test]
    fn v2_without_key_is_invalid() {
        let req = SeriesRequest::new(["X1"], 2020, 2021);
        let e = build_request(&ApiConfig::default(), &req).unwrap_err();
        assert!(matches!(e, Error::InvalidRequest(_)));
    }

    #[test]
    fn file_key_is_sent_trimmed() {
        let req = SeriesRequest::new(["X1"], 2020, 2021);
        let cfg = crate::config::Config::from_toml_str(
            "[api]\naccess_key = \" abc \"",
            std::path::Path::new("mem"),
        )
        .unwrap();
        let r = build_request(&cfg.api, &req).unwrap();
        assert!(r.url.ends_with("registrationkey=abc"), "{}", r.redacted_url());

        let blank = crate::config::Config::from_toml_str(
            "[api]\naccess_key = \"   \"",
            std::path::Path::new("mem"),
        )
        .unwrap();
        assert!(matches!(
            build_request(&blank.api, &req),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn v1_has_no_key_and_no_annual_flag() {
        let cfg = ApiConfig {
            version: ApiVersion::V1,
            base_url: "http://localhost:9/".into(),
            ..v2_config()
        };
        let req = SeriesRequest::new(["X1"], 2020, 2021).with_annual_average(true);
        let r = build_request(&cfg, &req).unwrap();
        assert_eq!(r.url, "http://localhost:9/v1/timeseries/data/");
        assert!(!r.body.unwrap().contains("annualaverage"));
    }

    #[test]
    fn annual_average_flag_on_v2() {
        let req = SeriesRequest::new(["X1"], 2020, 2021).with_annual_average(true);
        let r = build_request(&v2_config(), &req).unwrap();
        assert!(r.body.unwrap().contains(r#""annualaverage":true"#));
    }

    #[test]
    fn redaction_hides_key() {
        let req = SeriesRequest::new(["X1"], 2020, 2021);
        let r = build_request(&v2_config(), &req).unwrap();
        let shown = r.redacted_url();
        assert!(shown.ends_with("registrationkey=***"));
        assert!(!format!("{r:?}").contains("k3y"));
    }

    #[test]
    fn latest_is_v1_get() {
        let r = build_latest_request(&v2_config(), " lns14000000 ").unwrap();
        assert_eq!(r.method, Method::Get);
        assert_eq!(
            r.url,
            "https://api.bls.gov/publicAPI/v1/timeseries/data/LNS14000000"
        );
        assert!(r.body.is_none());
        assert!(build_latest_request(&v2_config(), "  ").is_err());
    }
}
