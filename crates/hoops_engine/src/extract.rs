//! HTML table extraction.
//!
//! Turns the markup of one `<table>` into a values [`Frame`] plus an
//! equal-shape links frame holding the `href` behind each cell. Header rows
//! are flattened to their leaf names, so grouped headers such as
//! "Basic Box Score Stats" above "MP | FG | FGA" come out as the field names.

use std::borrow::Cow;
use std::collections::HashMap;

use hoops_core::{Frame, Value};
use scraper::{ElementRef, Html};
use thiserror::Error;

const MAX_SPAN: usize = 64;
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no table found on the page")]
    NoTableFound,
    #[error("expected column '{field}' not found; tried: {}", tried.join(", "))]
    MissingColumn { field: String, tried: Vec<String> },
}

/// Cell values of one table plus, when any cell carries an anchor, the
/// parallel frame of raw `href`s.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub values: Frame,
    pub links: Option<Frame>,
}

/// Replaces comments that wrap table markup with their content.
pub fn unwrap_commented_tables(html: &str) -> Cow<'_, str> {
    if !html.contains(COMMENT_OPEN) {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut changed = false;
    while let Some(start) = rest.find(COMMENT_OPEN) {
        let body_start = start + COMMENT_OPEN.len();
        let Some(len) = rest[body_start..].find(COMMENT_CLOSE) else {
            break;
        };
        let body = &rest[body_start..body_start + len];
        let end = body_start + len + COMMENT_CLOSE.len();
        if body.contains("<table") {
            out.push_str(&rest[..start]);
            out.push_str(body);
            changed = true;
        } else {
            out.push_str(&rest[..end]);
        }
        rest = &rest[end..];
    }
    if !changed {
        return Cow::Borrowed(html);
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Parses a page after un-hiding commented tables.
pub fn parse_page(html: &str) -> Html {
    Html::parse_document(&unwrap_commented_tables(html))
}

/// Elements below `root` in document order.
pub fn descendant_elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}

pub fn is_table(element: &ElementRef<'_>) -> bool {
    element.value().name() == "table"
}

/// Extracts the first table of the document.
pub fn extract_primary_table(html: &str) -> Result<TableData, ExtractError> {
    let document = parse_page(html);
    let table = descendant_elements(document.root_element())
        .find(is_table)
        .ok_or(ExtractError::NoTableFound)?;
    Ok(extract_table(table))
}

/// Returns the first of `candidates` present in `frame`.
pub fn find_column<'c>(
    frame: &Frame,
    field: &str,
    candidates: &[&'c str],
) -> Result<&'c str, ExtractError> {
    candidates
        .iter()
        .copied()
        .find(|name| frame.has_column(name))
        .ok_or_else(|| ExtractError::MissingColumn {
            field: field.to_string(),
            tried: candidates.iter().map(|c| c.to_string()).collect(),
        })
}

struct Cell {
    text: String,
    href: Option<String>,
    colspan: usize,
    rowspan: usize,
}

pub fn extract_table(table: ElementRef<'_>) -> TableData {
    let (mut header_rows, mut body_rows) = (Vec::new(), Vec::new());
    for section in table.children().filter_map(ElementRef::wrap) {
        match section.value().name() {
            "thead" => header_rows.extend(rows_of(section)),
            "tbody" | "tfoot" => body_rows.extend(rows_of(section)),
            "tr" => body_rows.push(section),
            _ => {}
        }
    }
    if header_rows.is_empty() {
        let leading = body_rows.iter().take_while(|row| is_header_row(**row)).count();
        header_rows = body_rows.drain(..leading).collect();
    }

    let body: Vec<Vec<Cell>> = body_rows
        .into_iter()
        .filter(|row| !is_repeated_header(*row))
        .map(expanded_cells)
        .filter(|cells| !cells.is_empty())
        .collect();

    let mut names = leaf_header(&header_rows);
    if names.is_empty() {
        let width = body.iter().map(Vec::len).max().unwrap_or(0);
        names = vec![String::new(); width];
    }
    let columns = disambiguate(names);

    let mut values = Frame::new(columns.iter().cloned());
    let mut links = Frame::new(columns);
    let mut any_link = false;
    for cells in body {
        let mut value_row = Vec::with_capacity(cells.len());
        let mut link_row = Vec::with_capacity(cells.len());
        for cell in cells {
            any_link |= cell.href.is_some();
            value_row.push(Value::text(cell.text));
            link_row.push(Value::from_option(cell.href));
        }
        values.push_row(value_row);
        links.push_row(link_row);
    }

    TableData {
        values,
        links: any_link.then_some(links),
    }
}

fn rows_of(section: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "tr")
}

fn cell_elements(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "th" | "td"))
}

fn is_header_row(row: ElementRef<'_>) -> bool {
    let mut cells = cell_elements(row).peekable();
    cells.peek().is_some() && cells.all(|cell| cell.value().name() == "th")
}

fn is_repeated_header(row: ElementRef<'_>) -> bool {
    row.value().classes().any(|class| class == "thead")
}

fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

fn read_cell(cell: ElementRef<'_>) -> Cell {
    let text = cell.text().collect::<String>();
    let href = descendant_elements(cell)
        .filter(|el| el.value().name() == "a")
        .find_map(|anchor| anchor.value().attr("href"))
        .map(str::to_string);
    Cell {
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        href,
        colspan: span(cell, "colspan"),
        rowspan: span(cell, "rowspan"),
    }
}

/// Body cells with `colspan` repeated so each lands under its leaf column.
fn expanded_cells(row: ElementRef<'_>) -> Vec<Cell> {
    let mut out = Vec::new();
    for cell in cell_elements(row).map(read_cell) {
        for _ in 1..cell.colspan {
            out.push(Cell {
                text: cell.text.clone(),
                href: cell.href.clone(),
                colspan: 1,
                rowspan: 1,
            });
        }
        out.push(cell);
    }
    out
}

/// Resolves `colspan` / `rowspan` across the header rows and returns the
/// names of the last one.
fn leaf_header(rows: &[ElementRef<'_>]) -> Vec<String> {
    let mut carried: Vec<Option<(String, usize)>> = Vec::new();
    let mut leaf = Vec::new();
    for row in rows {
        let mut line: Vec<String> = Vec::new();
        let mut cells = cell_elements(*row).map(read_cell);
        loop {
            let col = line.len();
            if let Some((text, remaining)) = carried.get_mut(col).and_then(Option::take) {
                if remaining > 1 {
                    carried[col] = Some((text.clone(), remaining - 1));
                }
                line.push(text);
                continue;
            }
            let Some(cell) = cells.next() else {
                if carried.iter().skip(col).any(Option::is_some) {
                    line.push(String::new());
                    continue;
                }
                break;
            };
            for _ in 0..cell.colspan {
                let col = line.len();
                if cell.rowspan > 1 {
                    if carried.len() <= col {
                        carried.resize(col + 1, None);
                    }
                    carried[col] = Some((cell.text.clone(), cell.rowspan - 1));
                }
                line.push(cell.text.clone());
            }
        }
        leaf = line;
    }
    leaf
}

/// Empty names become `Unnamed: <i>`; repeats get `.1`, `.2`, ... suffixes.
fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let out = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_only_table_comments() {
        let html = "<p>a</p><!-- note --><div><!--<table><tr><td>1</td></tr></table>--></div>";
        assert_eq!(
            unwrap_commented_tables(html),
            "<p>a</p><!-- note --><div><table><tr><td>1</td></tr></table></div>"
        );
        assert!(matches!(unwrap_commented_tables("<!-- x -->"), Cow::Borrowed(_)));
    }

    #[test]
    fn duplicate_and_empty_names_are_disambiguated() {
        let names = vec!["PTS".into(), String::new(), "PTS".into(), "PTS".into()];
        assert_eq!(disambiguate(names), vec!["PTS", "Unnamed: 1", "PTS.1", "PTS.2"]);
    }
}
