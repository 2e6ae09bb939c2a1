//! Local case-count dashboard.
//!
//! Loads a baseline series of daily local cases, tops it up from the latest
//! situation reports published as PDFs, and serves two charts on a single page.

pub mod config;
mod error;
pub mod extract;
mod macros;
pub mod parse;
pub mod present;
pub mod process;
mod request;
pub mod serve;
pub mod series;
pub mod update;

pub use config::Config;
pub use error::{Error, Result};

const BASELINE_CSV_URL: &str = "https://raw.githubusercontent.com/yixianc/sglocalcovidcases/main/data/Table%20of%20Daily%20Unlink%20Cases.csv";
const REPORT_PAGE_URL: &str = "https://www.moh.gov.sg/covid-19/testing/situation-report-pdf";
/// Report links on the page are relative; they get joined onto this.
const REPORT_ORIGIN: &str = "https://www.moh.gov.sg";
const REPORT_LINK_PREFIX: &str = "/docs/librariesprovider5/";
const BIND_ADDR: &str = "127.0.0.1:8050";
/// Each report carries a 7 day cumulative figure, so the new day is that minus the 6 days before it.
const TRAILING_DAYS: usize = 6;
