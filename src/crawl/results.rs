use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

static GRID_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.preseea_grid").unwrap());
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr span").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Cells per result item: label, text, date, country, speaker.
const CELLS_PER_ITEM: usize = 5;
const LABEL_CELL: usize = 0;
const DATE_CELL: usize = 2;
const COUNTRY_CELL: usize = 3;

const TEXT_MATCH_MARKER: &str = "TextMatch";
const EMPTY_ROW_MARKER: &str = "EmptyData";
const NO_MATCH_TEXTS: &[&str] = &[
    "no se encontraron resultados",
    "no se han encontrado",
    "no hay resultados",
];

/// One transcript excerpt matched by a corpus query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    pub label: String,
    pub text: String,
    pub date: String,
    pub country: String,
}

/// What the server answered a search POST with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Results,
    NoMatches,
    /// The query form again, without a results grid.
    Postback,
    Unknown,
}

pub fn classify_page(html: &str) -> PageKind {
    let doc = Html::parse_document(html);
    match doc.select(&GRID_SEL).next() {
        Some(grid) if is_no_matches(grid) => PageKind::NoMatches,
        Some(_) => PageKind::Results,
        None if doc.select(&FORM_SEL).next().is_some() => PageKind::Postback,
        None => PageKind::Unknown,
    }
}

/// Parse the results grid into samples, in server order.
///
/// With a non-blank `phrase` the highlighted match is rebuilt around the
/// phrase; with a blank one (count queries) the excerpt is kept as is.
pub fn parse_results(html: &str, phrase: &str) -> Result<Vec<Sample>> {
    let doc = Html::parse_document(html);
    let grid = doc
        .select(&GRID_SEL)
        .next()
        .ok_or_else(|| Error::Parse("results grid missing".to_string()))?;

    let matches: Vec<ElementRef> = grid
        .select(&SPAN_SEL)
        .filter(|span| is_text_match(span))
        .collect();

    if matches.is_empty() {
        if is_no_matches(grid) {
            debug!("server reported no matches");
            return Ok(Vec::new());
        }
        return Err(Error::Parse(
            "results grid has no matches and no empty-result row".to_string(),
        ));
    }

    matches
        .into_iter()
        .enumerate()
        .map(|(idx, span)| {
            let cells = row_cells(span).ok_or_else(|| {
                Error::Parse(format!("match {} is not inside a results row", idx + 1))
            })?;
            if cells.len() != CELLS_PER_ITEM {
                return Err(Error::Parse(format!(
                    "results row {} has {} cells, expected {CELLS_PER_ITEM}",
                    idx + 1,
                    cells.len()
                )));
            }
            Ok(Sample {
                label: cell_text(cells[LABEL_CELL]),
                text: match_text(span, phrase),
                date: cell_text(cells[DATE_CELL]),
                country: cell_text(cells[COUNTRY_CELL]),
            })
        })
        .collect()
}

/// The `td` cells of the row holding `span`.
fn row_cells(span: ElementRef) -> Option<Vec<ElementRef>> {
    let row = span
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")?;
    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect();
    Some(cells)
}

fn is_text_match(span: &ElementRef) -> bool {
    let el = span.value();
    el.id().is_some_and(|id| id.contains(TEXT_MATCH_MARKER))
        || el.classes().any(|c| c.contains(TEXT_MATCH_MARKER))
}

fn is_no_matches(grid: ElementRef) -> bool {
    grid.select(&ROW_SEL).any(|row| {
        if row.value().classes().any(|c| c.contains(EMPTY_ROW_MARKER)) {
            return true;
        }
        let text = row.text().collect::<String>().to_lowercase();
        NO_MATCH_TEXTS.iter().any(|t| text.contains(t))
    })
}

fn cell_text(cell: ElementRef) -> String {
    collapse_ws(&cell.text().collect::<String>())
}

/// The server splits the excerpt around a highlight element; put the
/// searched phrase back in its place.
fn match_text(span: ElementRef, phrase: &str) -> String {
    if phrase.trim().is_empty() {
        return collapse_ws(&strip_annotations(&span.text().collect::<String>()));
    }

    let mut before = String::new();
    let mut after = String::new();
    let mut highlights = 0;
    for child in span.children() {
        match child.value() {
            Node::Text(text) if highlights == 0 => before.push_str(text),
            Node::Text(text) if highlights == 1 => after.push_str(text),
            Node::Element(_) => highlights += 1,
            _ => {}
        }
    }

    if highlights == 0 {
        return collapse_ws(&strip_annotations(&before));
    }

    let before = collapse_ws(&strip_annotations(&before));
    // Anything after the first transcription mark is annotation, not speech.
    let after = collapse_ws(after.split('<').next().unwrap_or_default());

    let mut text = String::with_capacity(before.len() + phrase.len() + after.len() + 2);
    if !before.is_empty() {
        text.push_str(&before);
        if !phrase.starts_with(char::is_whitespace) {
            text.push(' ');
        }
    }
    text.push_str(phrase);
    if !after.is_empty() {
        if !phrase.ends_with(char::is_whitespace) {
            text.push(' ');
        }
        text.push_str(&after);
    }
    text
}

fn strip_annotations(text: &str) -> String {
    ANNOTATION_RE.replace_all(text, " ").into_owned()
}

fn collapse_ws(text: &str) -> String {
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}.html")).unwrap()
    }

    #[test]
    fn parses_rows_in_server_order() {
        let samples = parse_results(&fixture("results"), "ustedes ").unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].label, "MADR_H13_001");
        assert_eq!(samples[0].date, "2007");
        assert_eq!(samples[0].country, "España");
        assert_eq!(
            samples[0].text,
            "bueno pues ustedes tienen que venir mañana"
        );
        assert_eq!(samples[3].label, "MADR_M33_004");
        assert_eq!(samples[3].text, "a ustedes les gusta el campo");
    }

    #[test]
    fn entities_decoded_and_annotations_dropped() {
        let samples = parse_results(&fixture("results"), "ustedes ").unwrap();
        // "&lt;risas&gt;" in the before-part is removed, after-part is cut.
        assert_eq!(samples[1].text, "y ustedes saben lo que pasó");
        assert!(samples.iter().all(|s| !s.text.contains('<')));
    }

    #[test]
    fn blank_phrase_keeps_excerpt() {
        let samples = parse_results(&fixture("results"), " ").unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[2].text, "ahora ustedes están muy lejos");
    }

    #[test]
    fn no_matches_sentinel_is_empty() {
        let html = fixture("no_results");
        assert_eq!(classify_page(&html), PageKind::NoMatches);
        assert!(parse_results(&html, "ustedes ").unwrap().is_empty());
    }

    #[test]
    fn short_cell_count_is_parse_error() {
        let html = r#"<table class="preseea_grid">
            <tr><td>L1</td><td><span id="g_lblTextMatch_0">a <span>x</span> b</span></td><td>2001</td></tr>
        </table>"#;
        assert!(matches!(parse_results(html, "x"), Err(Error::Parse(_))));
    }

    #[test]
    fn extra_rows_do_not_shift_fields() {
        let html = fixture("results").replace(
            r#"<tr class="preseea_grid_header">"#,
            r#"<tr class="pager"><td>1</td><td>2</td></tr>
  <tr class="preseea_grid_header">"#,
        );
        assert!(html.contains("pager"));
        let samples = parse_results(&html, "ustedes ").unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].label, "MADR_H13_001");
        assert_eq!(samples[0].date, "2007");
        assert_eq!(samples[0].country, "España");
    }

    #[test]
    fn row_with_extra_cell_is_parse_error() {
        let html = r#"<table class="preseea_grid">
            <tr><td>L1</td><td><span id="g_lblTextMatch_0">a <span>x</span> b</span></td>
                <td>2001</td><td>España</td><td>H</td><td>extra</td></tr>
        </table>"#;
        assert!(matches!(parse_results(html, "x"), Err(Error::Parse(_))));
    }

    #[test]
    fn grid_without_matches_or_sentinel_is_parse_error() {
        let html = r#"<table class="preseea_grid"><tr><th>Muestra</th></tr></table>"#;
        assert!(matches!(parse_results(html, "x"), Err(Error::Parse(_))));
    }

    #[test]
    fn missing_grid_is_parse_error() {
        assert!(matches!(
            parse_results("<html><body></body></html>", "x"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn page_kinds() {
        assert_eq!(classify_page(&fixture("results")), PageKind::Results);
        assert_eq!(classify_page(&fixture("landing")), PageKind::Postback);
        assert_eq!(classify_page("<p>maintenance</p>"), PageKind::Unknown);
    }
}
