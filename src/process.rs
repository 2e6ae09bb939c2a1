use chrono::Local;

use crate::extract::PdfTableExtractor;
use crate::parse::{latest_report_date, report_links};
use crate::present::Dashboard;
use crate::request::request_text;
use crate::series::load_baseline;
use crate::update::{update_series, HttpSource};
use crate::{info_time, Config, Result};

/// Loads the baseline, tops it up from the report page and renders the dashboard.
///
/// A missing baseline or an unreadable report page ends the run. Problems with
/// individual reports only cut the update short and end up on the page.
pub async fn process_site(config: &Config) -> Result<Dashboard> {
    let start_time = Local::now();
    // Client uses Arc so we can clone cheaply
    let client = reqwest::Client::new();

    info_time!("Started building dashboard");

    let mut series = load_baseline(&client, &config.baseline_url).await?;
    info_time!(start_time, "Loaded baseline.");

    let page = request_text(&client, &config.report_page_url).await?;
    let latest = latest_report_date(&page)?;
    let links = report_links(&page, &config.report_origin, &config.report_link_prefix)?;
    info_time!(
        "Newest report is for {latest}, {} report links listed",
        links.len()
    );

    let source = HttpSource::new(client.clone());
    let extractor = PdfTableExtractor::new(config.layout);
    let outcome = update_series(&mut series, latest, &links, &source, &extractor).await?;
    info_time!(
        start_time,
        "Appended {} days, series now ends {:?}",
        outcome.appended.len(),
        series.max_date()
    );

    let dashboard = Dashboard::build(&series, outcome)?;
    info_time!(start_time, "Finished building dashboard.");

    Ok(dashboard)
}
