//! Turns the final series into the dashboard page.

use chrono::NaiveDate;
use plotters::coord::ranged1d::{IntoSegmentedCoord, SegmentValue};
use plotters::prelude::*;
use plotters::style::FontTransform;

use crate::series::{Category, Series};
use crate::update::UpdateOutcome;
use crate::{Error, Result};

const PAGE_TITLE: &str = "Daily Number of Local Covid Cases";
const BAR_TITLE: &str = "Estimated Daily Number of Local Covid Cases (by Linked VS Unlinked)";
const TOTAL_TITLE: &str = "Estimated Daily Number of Local Covid Cases";
const BAR_CHART_SIZE: (u32, u32) = (1400, 580);
const TOTAL_CHART_SIZE: (u32, u32) = (1400, 450);

const LINKED_QO_COLOR: RGBColor = RGBColor(0, 128, 0);
const LINKED_NOT_QO_COLOR: RGBColor = RGBColor(255, 165, 0);
const UNLINKED_COLOR: RGBColor = RGBColor(255, 0, 0);
const TOTAL_COLOR: RGBColor = RGBColor(99, 110, 250);

/// Bottom of the stack first.
const STACK_ORDER: [Category; 3] = [
    Category::Unlinked,
    Category::LinkedNotQuarantined,
    Category::LinkedQuarantined,
];

const NOTES: [&str; 4] = [
    r#"Estimated based on daily figures from <a href="https://www.moh.gov.sg/covid-19/testing/situation-report-pdf">MOH Local Situation Report</a>"#,
    "Unlinked cases from 8 Sep are computed assuming there are no reclassification for cases in the previous days.",
    "<em>Data are unofficial estimates and are to be used at your own risk.</em>",
    "<em>Data for 12 Sep assumes the same proportion of linked qo, linked not on qo and unlinked as 11 Sep as MOH did not upload the correct sitrep for 12 Sep.</em>",
];

/// One (date, category) cell of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongRow {
    pub date: NaiveDate,
    pub category: Category,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: i64,
}

pub fn to_long_form(series: &Series) -> Vec<LongRow> {
    series
        .records()
        .iter()
        .flat_map(|record| {
            Category::ALL.map(|category| LongRow {
                date: record.date,
                category,
                value: record.count(category),
            })
        })
        .collect()
}

pub fn daily_totals(series: &Series) -> Vec<DailyTotal> {
    series
        .records()
        .iter()
        .map(|record| DailyTotal {
            date: record.date,
            total: record.total(),
        })
        .collect()
}

fn category_color(category: Category) -> RGBColor {
    match category {
        Category::LinkedQuarantined => LINKED_QO_COLOR,
        Category::LinkedNotQuarantined => LINKED_NOT_QO_COLOR,
        Category::Unlinked => UNLINKED_COLOR,
    }
}

fn chart_err(err: impl std::fmt::Display) -> Error {
    Error::Chart(err.to_string())
}

fn tick_label(date: NaiveDate) -> String {
    date.format("%d %b").to_string()
}

/// Regroups long rows into one bar per date. Rows sharing a date are added together.
fn bars_by_date(rows: &[LongRow]) -> Vec<(NaiveDate, [i64; 3])> {
    let mut bars: Vec<(NaiveDate, [i64; 3])> = Vec::new();
    for row in rows {
        let slot = Category::ALL
            .iter()
            .position(|c| *c == row.category)
            .unwrap_or_default();
        match bars.last_mut() {
            Some((date, counts)) if *date == row.date => counts[slot] += row.value,
            _ => {
                let mut counts = [0; 3];
                counts[slot] = row.value;
                bars.push((row.date, counts));
            }
        }
    }
    bars
}

fn padded(min: i64, max: i64) -> (i64, i64) {
    let pad = ((max - min) / 10).max(1);
    let min = if min < 0 { min - pad } else { min };
    (min, max + pad)
}

/// Stacked bars per date, positives stacked up from zero and negatives down from it.
/// Every non-zero segment carries its value.
pub fn render_bar_chart(rows: &[LongRow]) -> Result<String> {
    let bars = bars_by_date(rows);
    let n = bars.len().max(1) as i32;
    let y_max = bars
        .iter()
        .map(|(_, counts)| counts.iter().filter(|v| **v > 0).sum::<i64>())
        .max()
        .unwrap_or(0);
    let y_min = bars
        .iter()
        .map(|(_, counts)| counts.iter().filter(|v| **v < 0).sum::<i64>())
        .min()
        .unwrap_or(0);
    let (y_min, y_max) = padded(y_min, y_max);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, BAR_CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(BAR_TITLE, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(60)
            .build_cartesian_2d((0..n).into_segmented(), y_min..y_max)
            .map_err(chart_err)?;

        let label_for = |v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
                .ok()
                .and_then(|i| bars.get(i))
                .map(|(date, _)| tick_label(*date))
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len().max(1))
            .x_label_formatter(&label_for)
            .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
            .x_desc("Date")
            .y_desc("Num of Cases")
            .draw()
            .map_err(chart_err)?;

        let value_style = ("sans-serif", 10)
            .into_font()
            .transform(FontTransform::Rotate90)
            .color(&BLACK);
        let mut value_labels = Vec::new();
        let mut above = vec![0i64; bars.len()];
        let mut below = vec![0i64; bars.len()];
        for category in STACK_ORDER {
            let slot = Category::ALL
                .iter()
                .position(|c| *c == category)
                .unwrap_or_default();
            let color = category_color(category);

            let mut rects = Vec::with_capacity(bars.len());
            for (i, (_, counts)) in bars.iter().enumerate() {
                let value = counts[slot];
                let base = if value < 0 { &mut below[i] } else { &mut above[i] };
                let start = *base;
                *base += value;
                let (lo, hi) = (start.min(*base), start.max(*base));

                let x = i as i32;
                let mut rect = Rectangle::new(
                    [(SegmentValue::Exact(x), lo), (SegmentValue::Exact(x + 1), hi)],
                    color.filled(),
                );
                rect.set_margin(0, 0, 2, 2);
                rects.push(rect);

                if value != 0 {
                    value_labels.push(Text::new(
                        value.to_string(),
                        (SegmentValue::CenterOf(x), lo + (hi - lo) / 2),
                        value_style.clone(),
                    ));
                }
            }

            chart
                .draw_series(rects)
                .map_err(chart_err)?
                .label(category.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart.draw_series(value_labels).map_err(chart_err)?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Daily total as a line with every point labelled.
pub fn render_total_chart(totals: &[DailyTotal]) -> Result<String> {
    let n = totals.len() as i32;
    let y_max = totals.iter().map(|t| t.total).max().unwrap_or(0).max(0);
    let y_min = totals.iter().map(|t| t.total).min().unwrap_or(0).min(0);
    let (y_min, y_max) = padded(y_min, y_max);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, TOTAL_CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(TOTAL_TITLE, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(60)
            .build_cartesian_2d(-1..n, y_min..y_max)
            .map_err(chart_err)?;

        let label_for = |i: &i32| {
            usize::try_from(*i)
                .ok()
                .and_then(|i| totals.get(i))
                .map(|t| tick_label(t.date))
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(totals.len() + 2)
            .x_label_formatter(&label_for)
            .x_label_style(("sans-serif", 11).into_font().transform(FontTransform::Rotate90))
            .x_desc("Date")
            .y_desc("Total")
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(
                totals.iter().enumerate().map(|(i, t)| (i as i32, t.total)),
                TOTAL_COLOR.stroke_width(2),
            ))
            .map_err(chart_err)?;
        chart
            .draw_series(totals.iter().enumerate().map(|(i, t)| {
                EmptyElement::at((i as i32, t.total))
                    + Circle::new((0, 0), 3, TOTAL_COLOR.filled())
                    + Text::new(t.total.to_string(), (-8, -18), ("sans-serif", 11).into_font())
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Everything the page shows, rendered once per run.
#[derive(Debug, Clone)]
pub struct Dashboard {
    outcome: UpdateOutcome,
    bar_svg: String,
    total_svg: String,
}

impl Dashboard {
    pub fn build(series: &Series, outcome: UpdateOutcome) -> Result<Self> {
        let bar_svg = render_bar_chart(&to_long_form(series))?;
        let total_svg = render_total_chart(&daily_totals(series))?;
        Ok(Self {
            outcome,
            bar_svg,
            total_svg,
        })
    }

    pub fn render_page(&self) -> String {
        let notes: String = NOTES.iter().map(|note| format!("<p>{note}</p>\n")).collect();
        let warnings: String = self
            .outcome
            .warning_text()
            .lines()
            .map(|line| format!("<div class=\"warning\">{}</div>\n", escape_html(line)))
            .collect();
        let issues = if self.outcome.issues.is_empty() {
            String::new()
        } else {
            let items: String = self
                .outcome
                .issues
                .iter()
                .map(|issue| format!("<li>{}</li>\n", escape_html(&issue.to_string())))
                .collect();
            format!("<ul class=\"issues\">\n{items}</ul>\n")
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<style>body {{ font-family: sans-serif; margin: 2em; }} .warning {{ color: #c00; font-weight: bold; }} svg {{ max-width: 100%; height: auto; }}</style>
</head>
<body>
<h1>{PAGE_TITLE}</h1>
{notes}{warnings}{issues}<div id="main-graph">{bar}</div>
<div id="total-graph">{total}</div>
</body>
</html>
"#,
            bar = self.bar_svg,
            total = self.total_svg,
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
