//! Reading the 7 day cumulative counts out of a situation report.
//!
//! Report layouts change without notice, so the reading strategy sits behind
//! [`TableExtractor`] and the update logic never looks inside a document itself.

use lopdf::{Document, Object};

use crate::series::{parse_count, Category};
use crate::{Error, Result};

/// Fragments whose baselines are this close (in PDF units) share a row.
const ROW_TOLERANCE: f64 = 2.0;
/// A `TJ` adjustment wider than this (thousandths of an em) reads as a space.
const TJ_SPACE_GAP: f64 = 200.0;

/// 7 day cumulative counts reported for each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyCounts {
    pub linked_qo: i64,
    pub linked_not_qo: i64,
    pub unlinked: i64,
}

impl WeeklyCounts {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::LinkedQuarantined => self.linked_qo,
            Category::LinkedNotQuarantined => self.linked_not_qo,
            Category::Unlinked => self.unlinked,
        }
    }
}

pub trait TableExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> Result<WeeklyCounts>;
}

/// Where the counts sit in a report. `page` is 1-based, `column` and `rows`
/// 0-based within the table, header row included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    pub page: u32,
    pub column: usize,
    /// Linked and QO, linked and not QO, unlinked.
    pub rows: [usize; 3],
}

impl Default for CellLayout {
    fn default() -> Self {
        Self {
            page: 1,
            column: 3,
            rows: [2, 3, 4],
        }
    }
}

impl CellLayout {
    pub fn read(&self, table: &TextTable) -> Result<WeeklyCounts> {
        let [qo_row, not_qo_row, unlinked_row] = self.rows;
        Ok(WeeklyCounts {
            linked_qo: table.count(qo_row, self.column)?,
            linked_not_qo: table.count(not_qo_row, self.column)?,
            unlinked: table.count(unlinked_row, self.column)?,
        })
    }
}

/// A run of text drawn at one position on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Rows of cells recovered from positioned text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Fragments on the same baseline form a row, top of the page first.
    /// Every fragment is one cell, left to right.
    pub fn from_fragments(mut fragments: Vec<TextFragment>) -> Self {
        fragments.retain(|f| !f.text.trim().is_empty());
        fragments.sort_by(|a, b| b.y.total_cmp(&a.y));

        let mut lines: Vec<(f64, Vec<TextFragment>)> = Vec::new();
        for fragment in fragments {
            match lines.last_mut() {
                Some((y, line)) if (*y - fragment.y).abs() <= ROW_TOLERANCE => line.push(fragment),
                _ => lines.push((fragment.y, vec![fragment])),
            }
        }

        let rows = lines
            .into_iter()
            .map(|(_, mut line)| {
                line.sort_by(|a, b| a.x.total_cmp(&b.x));
                line.into_iter().map(|f| f.text.trim().to_string()).collect()
            })
            .collect();
        Self { rows }
    }

    /// The table proper: starting at the first of the widest rows, every
    /// following row with at least two cells. Titles and footnotes fall away.
    pub fn table_region(&self) -> TextTable {
        let widest = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        if widest < 2 {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .skip_while(|row| row.len() < widest)
            .take_while(|row| row.len() >= 2)
            .cloned()
            .collect();
        TextTable { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    fn count(&self, row: usize, column: usize) -> Result<i64> {
        let value = self.cell(row, column).ok_or(Error::MissingCell { row, column })?;
        parse_count(value).ok_or_else(|| Error::InvalidCell {
            row,
            column,
            value: value.to_string(),
        })
    }
}

/// Rebuilds the table on one PDF page from where its text is drawn and reads
/// the counts at fixed cell coordinates.
#[derive(Debug, Clone, Default)]
pub struct PdfTableExtractor {
    layout: CellLayout,
}

impl PdfTableExtractor {
    pub fn new(layout: CellLayout) -> Self {
        Self { layout }
    }

    pub fn page_table(&self, document: &[u8]) -> Result<TextTable> {
        let doc = Document::load_mem(document)?;
        let fragments = page_fragments(&doc, self.layout.page)?;
        Ok(TextTable::from_fragments(fragments).table_region())
    }
}

impl TableExtractor for PdfTableExtractor {
    fn extract(&self, document: &[u8]) -> Result<WeeklyCounts> {
        let table = self.page_table(document)?;
        self.layout.read(&table)
    }
}

/// Walks the page's content stream, tracking the text position through
/// `Td`, `TD`, `Tm`, `T*` and friends. Scaling and the CTM are ignored.
fn page_fragments(doc: &Document, page: u32) -> Result<Vec<TextFragment>> {
    let page_id = *doc.get_pages().get(&page).ok_or(Error::MissingPage(page))?;
    let content = doc.get_and_decode_page_content(page_id)?;

    let mut fragments = Vec::new();
    let (mut x, mut y, mut leading) = (0.0_f64, 0.0_f64, 0.0_f64);
    for op in &content.operations {
        let num = |i: usize| op.operands.get(i).and_then(number).unwrap_or(0.0);
        let shown = match op.operator.as_str() {
            "BT" => {
                (x, y) = (0.0, 0.0);
                None
            }
            "Td" => {
                x += num(0);
                y += num(1);
                None
            }
            "TD" => {
                leading = -num(1);
                x += num(0);
                y += num(1);
                None
            }
            "Tm" => {
                (x, y) = (num(4), num(5));
                None
            }
            "TL" => {
                leading = num(0);
                None
            }
            "T*" => {
                y -= leading;
                None
            }
            "Tj" | "TJ" => Some(shown_text(&op.operands)),
            "'" => {
                y -= leading;
                Some(shown_text(&op.operands))
            }
            "\"" => {
                y -= leading;
                Some(shown_text(op.operands.get(2..).unwrap_or_default()))
            }
            _ => None,
        };
        if let Some(text) = shown {
            fragments.push(TextFragment { x, y, text });
        }
    }
    Ok(fragments)
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn shown_text(operands: &[Object]) -> String {
    let mut text = String::new();
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
            Object::Array(items) => {
                for item in items {
                    match item {
                        Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                        other if number(other).is_some_and(|gap| gap < -TJ_SPACE_GAP) => {
                            text.push(' ')
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    text
}

/// UTF-16 when it carries a BOM, otherwise one byte per character. Enough for
/// the digits and Latin labels in a report table.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    use super::*;

    const TABLE: [[&str; 4]; 5] = [
        ["Category", "Today", "Past 6 days", "7-day cumulative"],
        ["Local cases", "1,012", "5,008", "6,020"],
        ["Linked and QO", "400", "2,030", "2,430"],
        ["Linked and not QO", "300", "1,615", "1,915"],
        ["Unlinked", "200", "1,475", "1,675"],
    ];

    fn fragment(x: f64, y: f64, text: &str) -> TextFragment {
        TextFragment {
            x,
            y,
            text: text.into(),
        }
    }

    /// One page: a title, the table with one BT/Td/Tj/ET per cell, a footnote.
    fn report_pdf() -> Vec<u8> {
        let mut operations = Vec::new();
        let mut show = |x: i64, y: i64, text: &str| {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        };
        show(72, 780, "Local Situation Report");
        // Columns written first, so stream order says nothing about rows.
        for col in 0..4 {
            for (row, cells) in TABLE.iter().enumerate() {
                show(72 + 120 * col as i64, 700 - 20 * row as i64, cells[col]);
            }
        }
        show(72, 560, "Figures are provisional");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn reads_counts_from_positioned_pdf_table() {
        let counts = PdfTableExtractor::default().extract(&report_pdf()).unwrap();

        assert_eq!(
            counts,
            WeeklyCounts {
                linked_qo: 2430,
                linked_not_qo: 1915,
                unlinked: 1675,
            }
        );
    }

    #[test]
    fn page_table_keeps_only_the_table() {
        let table = PdfTableExtractor::default().page_table(&report_pdf()).unwrap();

        assert_eq!(table.rows().len(), 5);
        assert_eq!(table.cell(0, 3), Some("7-day cumulative"));
        assert_eq!(table.cell(3, 0), Some("Linked and not QO"));
    }

    #[test]
    fn missing_page_is_an_error() {
        let extractor = PdfTableExtractor::new(CellLayout {
            page: 2,
            ..CellLayout::default()
        });
        assert!(matches!(extractor.extract(&report_pdf()), Err(Error::MissingPage(2))));
    }

    #[test]
    fn fragments_group_by_baseline_then_x() {
        let table = TextTable::from_fragments(vec![
            fragment(200.0, 500.0, "b2"),
            fragment(10.0, 520.0, "a1"),
            fragment(10.0, 499.2, "b1"),
            fragment(100.0, 520.5, "a2"),
            fragment(50.0, 300.0, "   "),
        ]);

        assert_eq!(
            table.rows(),
            &[
                vec!["a1".to_string(), "a2".to_string()],
                vec!["b1".to_string(), "b2".to_string()],
            ]
        );
    }

    #[test]
    fn table_region_drops_title_and_footnote() {
        let table = TextTable::from_rows(vec![
            vec!["Title".into()],
            vec!["h1".into(), "h2".into(), "h3".into()],
            vec!["r1".into(), "1".into(), "2".into()],
            vec!["r2".into(), "3".into()],
            vec!["Footnote".into()],
            vec!["x".into(), "y".into()],
        ]);

        let region = table.table_region();
        assert_eq!(region.rows().len(), 3);
        assert_eq!(region.cell(0, 0), Some("h1"));
    }

    #[test]
    fn default_layout_reads_column_three() {
        let table = TextTable::from_rows(
            TABLE
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        );

        assert_eq!(
            CellLayout::default().read(&table).unwrap(),
            WeeklyCounts {
                linked_qo: 2430,
                linked_not_qo: 1915,
                unlinked: 1675,
            }
        );
    }

    #[test]
    fn missing_cell_is_an_error() {
        let table = TextTable::from_rows(vec![vec!["a".into(), "b".into()]; 2]);
        let res = CellLayout::default().read(&table);
        assert!(matches!(res, Err(Error::MissingCell { row: 2, column: 3 })));
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let mut rows = vec![vec!["h".to_string()]; 2];
        rows.push(vec!["x".into(), "x".into(), "x".into(), "n/a".into()]);
        let res = CellLayout::default().read(&TextTable::from_rows(rows));
        assert!(matches!(res, Err(Error::InvalidCell { row: 2, column: 3, .. })));
    }

    #[test]
    fn tj_arrays_and_utf16_strings_decode() {
        let ops = [Object::Array(vec![
            Object::string_literal("Linked"),
            Object::Integer(-250),
            Object::string_literal("QO"),
            Object::Integer(-20),
            Object::String(vec![0xFE, 0xFF, 0x00, 0x21], lopdf::StringFormat::Hexadecimal),
        ])];
        assert_eq!(shown_text(&ops), "Linked QO!");
    }

    #[test]
    fn garbage_bytes_are_not_a_pdf() {
        let res = PdfTableExtractor::default().extract(b"<html>not found</html>");
        assert!(matches!(res, Err(Error::Pdf(_))));
    }
}
