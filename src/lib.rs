//! bls_rs
//!
//! A lightweight Rust library for retrieving, tabulating, charting, and
//! summarizing time series from the BLS Public Data API. Pairs with the `bls` CLI.
//!
//! ### Pipeline
//! - [`api::build_request`]: pure request construction (URL, key, JSON body)
//! - [`Client::execute`]: one blocking round trip with an explicit timeout
//! - [`models::parse_envelope`]: typed decode of the response envelope
//! - [`table::tabulate`]: year-ascending table per series
//! - [`viz::plot_chart`]: SVG/PNG line chart
//!
//! ### Example
//! ```no_run
//! use bls_rs::{Client, SeriesRequest};
//! use bls_rs::config::Config;
//!
//! let mut config = Config::default();
//! config.apply_env(); // BLS_API_KEY
//! let client = Client::new(config.api.clone())?;
//! let envelope = client.fetch(&SeriesRequest::new(["CUUR0000SA0"], 2012, 2016))?;
//! bls_rs::storage::save_csv(&envelope.observations().cloned().collect::<Vec<_>>(), "cpi.csv")?;
//! bls_rs::viz::plot_envelope(&envelope, "cpi.svg", &config.plot)?;
//! for s in bls_rs::stats::series_summary(&envelope) {
//!     println!("{:#?}", s);
//! }
//! # Ok::<(), bls_rs::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod stats;
pub mod storage;
pub mod table;
pub mod viz;

pub use api::Client;
pub use error::{Error, Result};
pub use models::{AccessKey, Observation, ResponseEnvelope, SeriesRequest, parse_envelope};
pub use table::{Table, tabulate};
