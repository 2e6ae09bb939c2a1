//! Extends the baseline series with the days published since.
//!
//! Each report states 7 day cumulative counts, so a new day is that figure
//! minus the 6 days already in the series. Reports are consumed oldest first
//! and every derivation leans on the records appended before it, which is why
//! the first report that can't be dated or read ends the update.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::warn;

use crate::extract::{TableExtractor, WeeklyCounts};
use crate::parse::ReportLink;
use crate::request::request_bytes;
use crate::series::{DailyRecord, Series};
use crate::{info_time, Error, Result, TRAILING_DAYS};

/// Somewhere to fetch report documents from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        request_bytes(&self.client, url).await
    }
}

/// Advisory only, the record is still appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateWarning {
    DateMismatch { expected: NaiveDate, found: NaiveDate },
}

impl fmt::Display for UpdateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateWarning::DateMismatch { expected, found } => write!(
                f,
                "Warning: PDF for {expected} is uploaded wrongly! Expect {expected} but PDF is for {found}"
            ),
        }
    }
}

/// Why the series stops short of the newest report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateIssue {
    /// The page lists fewer reports than there are missing days.
    ShortOfLinks { missing_days: usize, links: usize },
    UnparsedDate {
        expected: NaiveDate,
        url: String,
        reason: String,
    },
    Report {
        date: NaiveDate,
        url: String,
        reason: String,
    },
}

impl fmt::Display for UpdateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateIssue::ShortOfLinks { missing_days, links } => write!(
                f,
                "{missing_days} days are missing but only {links} reports are listed"
            ),
            UpdateIssue::UnparsedDate {
                expected,
                url,
                reason,
            } => write!(
                f,
                "Stopped before {expected}: report {url} has no readable date ({reason})"
            ),
            UpdateIssue::Report { date, url, reason } => {
                write!(f, "Stopped before {date}: couldn't read report {url} ({reason})")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub appended: Vec<DailyRecord>,
    pub warnings: Vec<UpdateWarning>,
    pub issues: Vec<UpdateIssue>,
}

impl UpdateOutcome {
    /// Empty when nothing looked off.
    pub fn warning_text(&self) -> String {
        self.warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reports to process, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub missing_days: usize,
    pub links: Vec<ReportLink>,
}

/// `links` are newest first, as listed on the page.
pub fn plan_update(series_max: NaiveDate, latest: NaiveDate, links: &[ReportLink]) -> UpdatePlan {
    let missing_days = usize::try_from((latest - series_max).num_days()).unwrap_or(0);
    let mut selected = links[..missing_days.min(links.len())].to_vec();
    selected.reverse();
    UpdatePlan {
        missing_days,
        links: selected,
    }
}

/// New day's counts: the weekly figure minus what the last 6 days already account for.
pub fn derive_record(series: &Series, date: NaiveDate, weekly: &WeeklyCounts) -> DailyRecord {
    use crate::series::Category::*;

    let derive = |c| weekly.get(c) - series.trailing_sum(c, TRAILING_DAYS);
    DailyRecord {
        date,
        linked_qo: derive(LinkedQuarantined),
        linked_not_qo: derive(LinkedNotQuarantined),
        unlinked: derive(Unlinked),
    }
}

/// Appends one record per missing day up to `latest`.
///
/// Only an empty baseline is an error. Anything wrong with an individual
/// report ends the update early and is reported in the outcome.
pub async fn update_series<S, E>(
    series: &mut Series,
    latest: NaiveDate,
    links: &[ReportLink],
    source: &S,
    extractor: &E,
) -> Result<UpdateOutcome>
where
    S: ReportSource + ?Sized,
    E: TableExtractor + ?Sized,
{
    let series_max = series.max_date().ok_or(Error::EmptyBaseline)?;
    let plan = plan_update(series_max, latest, links);
    let mut outcome = UpdateOutcome::default();

    if plan.missing_days == 0 {
        info_time!("Series is up to date ({series_max}), newest report is {latest}");
        return Ok(outcome);
    }
    info_time!(
        "{} days missing after {series_max}, {} reports to read",
        plan.missing_days,
        plan.links.len()
    );
    if plan.links.len() < plan.missing_days {
        let issue = UpdateIssue::ShortOfLinks {
            missing_days: plan.missing_days,
            links: plan.links.len(),
        };
        warn!("{issue}");
        outcome.issues.push(issue);
    }

    for link in plan.links {
        let current_max = series.max_date().ok_or(Error::EmptyBaseline)?;
        let expected = current_max
            .succ_opt()
            .ok_or(Error::DateOverflow(current_max))?;

        let found = match link.date() {
            Ok(found) => found,
            Err(err) => {
                let issue = UpdateIssue::UnparsedDate {
                    expected,
                    url: link.url,
                    reason: err.to_string(),
                };
                warn!("{issue}");
                outcome.issues.push(issue);
                break;
            }
        };
        if found != expected {
            let warning = UpdateWarning::DateMismatch { expected, found };
            warn!("{warning}");
            outcome.warnings.push(warning);
        }

        let weekly = match read_report(source, extractor, &link.url).await {
            Ok(weekly) => weekly,
            Err(err) => {
                let issue = UpdateIssue::Report {
                    date: expected,
                    url: link.url,
                    reason: err.to_string(),
                };
                warn!("{issue}");
                outcome.issues.push(issue);
                break;
            }
        };

        let record = derive_record(series, expected, &weekly);
        info_time!(
            "Derived {expected}: {} linked and QO, {} linked and not QO, {} unlinked",
            record.linked_qo,
            record.linked_not_qo,
            record.unlinked
        );
        series.push(record);
        outcome.appended.push(record);
    }

    Ok(outcome)
}

async fn read_report<S, E>(source: &S, extractor: &E, url: &str) -> Result<WeeklyCounts>
where
    S: ReportSource + ?Sized,
    E: TableExtractor + ?Sized,
{
    let document = source.fetch(url).await?;
    extractor.extract(&document)
}
