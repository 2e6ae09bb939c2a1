use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is missing. Selector: {0}")]
    ParseMissingSelector(String),
    #[error("The report page has no table of reports.")]
    MissingTable,
    #[error("Couldn't find a report date in the first row of the report table: {0}")]
    MissingReportDate(String),
    #[error("Couldn't parse a report date out of link: {0}")]
    LinkDate(String),

    #[error("Baseline row {row}: {reason}")]
    BaselineRow { row: usize, reason: String },
    #[error("Baseline has no records, nothing to extend.")]
    EmptyBaseline,
    #[error("Day after {0} is out of range.")]
    DateOverflow(NaiveDate),

    #[error("Report has no page {0}.")]
    MissingPage(u32),
    #[error("Report table has no cell at row {row}, column {column}.")]
    MissingCell { row: usize, column: usize },
    #[error("Report table cell at row {row}, column {column} isn't a count: {value:?}")]
    InvalidCell {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Couldn't draw chart: {0}")]
    Chart(String),
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Pdf Error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Regex Error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}
