use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};

use crate::{Error, Result};

/// One situation report PDF listed on the report page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLink {
    pub url: String,
}

impl ReportLink {
    /// Date the report claims to cover, read from its URL.
    pub fn date(&self) -> Result<NaiveDate> {
        parse_link_date(&self.url)
    }
}

/// Reads the date of the newest report: the first non-header row of the first table.
pub fn latest_report_date(html: &str) -> Result<NaiveDate> {
    let doc = Html::parse_document(html);
    let table_selector = create_selector("table")?;
    let row_selector = create_selector("tr")?;

    let table = doc.select(&table_selector).next().ok_or(Error::MissingTable)?;
    // Row 0 is the header.
    let row = table
        .select(&row_selector)
        .nth(1)
        .ok_or_else(|| Error::MissingReportDate("table has no rows".into()))?;
    let text = row.text().collect::<Vec<_>>().join(" ");

    let date_re = create_regex(r"(\d{1,2})\s+([A-Za-z]{3,9})\s+(\d{4})")?;
    let date = date_re.captures(&text).and_then(|caps| {
        let normalised = format!("{:0>2} {} {}", &caps[1], &caps[2], &caps[3]);
        ["%d %b %Y", "%d %B %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&normalised, fmt).ok())
    });
    date.ok_or_else(|| Error::MissingReportDate(text.trim().to_string()))
}

/// All report links in page order (newest first), made absolute against `origin`.
pub fn report_links(html: &str, origin: &str, prefix: &str) -> Result<Vec<ReportLink>> {
    let doc = Html::parse_document(html);
    let link_selector = create_selector("a[href]")?;
    let origin = origin.trim_end_matches('/');

    let links = doc
        .select(&link_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with(prefix))
        .map(|href| ReportLink {
            url: format!("{origin}{href}"),
        })
        .collect();
    Ok(links)
}

/// Tries an 8 digit `YYYYMMDD` date first, then `DD-Mon-YYYY`.
pub fn parse_link_date(link: &str) -> Result<NaiveDate> {
    let numeric_re = create_regex(r"\d{8}")?;
    let named_re = create_regex(r"\d{2}-[A-Za-z]{3}-\d{4}")?;

    let date = numeric_re
        .find_iter(link)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y%m%d").ok())
        .or_else(|| {
            named_re
                .find_iter(link)
                .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%d-%b-%Y").ok())
        });
    date.ok_or_else(|| Error::LinkDate(link.to_string()))
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

#[inline]
fn create_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}
