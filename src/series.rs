//! Daily case records and the series they make up.

use std::fmt;
use std::io::Read;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::request::request_text;
use crate::{info_time, Error, Result};

/// The three ways a local case is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    LinkedQuarantined,
    LinkedNotQuarantined,
    Unlinked,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::LinkedQuarantined,
        Category::LinkedNotQuarantined,
        Category::Unlinked,
    ];

    /// Column header in the baseline CSV, also used as chart label.
    pub fn label(self) -> &'static str {
        match self {
            Category::LinkedQuarantined => "Linked and QO",
            Category::LinkedNotQuarantined => "Linked and not QO",
            Category::Unlinked => "Unlinked",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub linked_qo: i64,
    pub linked_not_qo: i64,
    pub unlinked: i64,
}

impl DailyRecord {
    pub fn count(&self, category: Category) -> i64 {
        match category {
            Category::LinkedQuarantined => self.linked_qo,
            Category::LinkedNotQuarantined => self.linked_not_qo,
            Category::Unlinked => self.unlinked,
        }
    }

    pub fn total(&self) -> i64 {
        self.linked_qo + self.linked_not_qo + self.unlinked
    }
}

/// Chronologically ordered daily records. Dates are expected to be unique but that isn't checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Series {
    records: Vec<DailyRecord>,
}

#[derive(Debug, Deserialize)]
struct BaselineRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Linked and QO")]
    linked_qo: String,
    #[serde(rename = "Linked and not QO")]
    linked_not_qo: String,
    #[serde(rename = "Unlinked")]
    unlinked: String,
}

const BASELINE_DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%b-%Y", "%d %b %Y", "%d-%b-%y"];

impl Series {
    pub fn new(mut records: Vec<DailyRecord>) -> Self {
        // Stable, so rows sharing a date keep their file order.
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    /// Parses the baseline CSV: `Date, Linked and QO, Linked and not QO, Unlinked`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for (idx, row) in reader.deserialize::<BaselineRow>().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let row = row?;
            let bad = |reason: String| Error::BaselineRow { row: line, reason };

            let date = parse_baseline_date(&row.date)
                .ok_or_else(|| bad(format!("unrecognised date {:?}", row.date)))?;
            let count = |raw: &str, category: Category| {
                parse_count(raw).ok_or_else(|| bad(format!("{category} isn't a count: {raw:?}")))
            };

            records.push(DailyRecord {
                date,
                linked_qo: count(&row.linked_qo, Category::LinkedQuarantined)?,
                linked_not_qo: count(&row.linked_not_qo, Category::LinkedNotQuarantined)?,
                unlinked: count(&row.unlinked, Category::Unlinked)?,
            });
        }

        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Sum of the last `n` records for one category, or of all of them if there are fewer.
    pub fn trailing_sum(&self, category: Category, n: usize) -> i64 {
        let start = self.records.len().saturating_sub(n);
        self.records[start..].iter().map(|r| r.count(category)).sum()
    }

    pub fn push(&mut self, record: DailyRecord) {
        self.records.push(record);
    }
}

fn parse_baseline_date(raw: &str) -> Option<NaiveDate> {
    // Exported sheets sometimes carry a midnight time.
    let raw = raw.split_whitespace().collect::<Vec<_>>();
    let raw = match raw.as_slice() {
        [date, time] if time.contains(':') => date.to_string(),
        parts => parts.join(" "),
    };
    BASELINE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok())
}

/// Counts may carry thousands separators.
pub(crate) fn parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Downloads and parses the baseline series. Failing here ends the run.
pub async fn load_baseline(client: &Client, url: &str) -> Result<Series> {
    let body = request_text(client, url).await?;
    let series = Series::from_csv_reader(body.as_bytes())?;
    info_time!(
        "Loaded {} baseline records, last one for {:?}",
        series.len(),
        series.max_date()
    );
    Ok(series)
}
