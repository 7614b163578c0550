//! Field extraction from a rendered case-status page.
//!
//! Every field is looked up on its own and yields `None` when its element is
//! missing, so one absent block never hides the others.

use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use url::Url;

use crate::domain::{CaseDetails, OrderLink};

const PETITIONER: &str = "span.Petitioner_Advocate_table";
const RESPONDENT: &str = "span.Respondent_Advocate_table";
const FILING_DATE_SPANS: &str = "span[style*='text-align:left']";
const STRONG: &str = "strong";
const ORDER_TABLE: &str = "table.order_table";
const LINK: &str = "a";

const FILING_DATE_LABEL: &str = "Filing Date";
const NEXT_HEARING_LABEL: &str = "Next Hearing Date";

/// Column of an order row that carries the order date.
const ORDER_DATE_COLUMN: usize = 3;

fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("Invalid selector defined in code"))
}

/// Extracts all four fields from `html`. `page_url` is used to resolve
/// relative order links.
#[must_use]
pub fn extract_case_details(html: &str, page_url: Option<&str>) -> CaseDetails {
    let document = Html::parse_document(html);
    let base = page_url.and_then(|u| Url::parse(u).ok());

    CaseDetails::from_parts(
        parties(&document),
        filing_date(&document),
        next_hearing_date(&document),
        orders(&document, base.as_ref()),
    )
}

#[must_use]
pub fn parties(document: &Html) -> Option<String> {
    static PETITIONER_SEL: OnceLock<Selector> = OnceLock::new();
    static RESPONDENT_SEL: OnceLock<Selector> = OnceLock::new();

    let petitioner = document
        .select(selector(&PETITIONER_SEL, PETITIONER))
        .next()?;
    let respondent = document
        .select(selector(&RESPONDENT_SEL, RESPONDENT))
        .next()?;

    Some(format!(
        "{} vs. {}",
        first_line(petitioner),
        first_line(respondent)
    ))
}

#[must_use]
pub fn filing_date(document: &Html) -> Option<String> {
    static SPANS: OnceLock<Selector> = OnceLock::new();

    let text = document
        .select(selector(&SPANS, FILING_DATE_SPANS))
        .map(full_text)
        .find(|text| text.contains(FILING_DATE_LABEL))?;

    text.rsplit(':').next().map(|date| date.trim().to_string())
}

#[must_use]
pub fn next_hearing_date(document: &Html) -> Option<String> {
    static STRONGS: OnceLock<Selector> = OnceLock::new();

    let label = document
        .select(selector(&STRONGS, STRONG))
        .find(|el| full_text(*el).contains(NEXT_HEARING_LABEL))?;

    let value = label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == STRONG)?;

    Some(full_text(value).trim().to_string())
}

/// Any row without a date column drops the whole list, matching how the
/// page is treated when its order table is malformed.
#[must_use]
pub fn orders(document: &Html, base: Option<&Url>) -> Option<Vec<OrderLink>> {
    static TABLE: OnceLock<Selector> = OnceLock::new();
    static LINKS: OnceLock<Selector> = OnceLock::new();

    let table = document.select(selector(&TABLE, ORDER_TABLE)).next()?;

    table
        .select(selector(&LINKS, LINK))
        .map(|link| {
            let row = link
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "tr")?;

            let date_cell = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == "td")
                .nth(ORDER_DATE_COLUMN)?;

            Some(OrderLink {
                date: full_text(date_cell).trim().to_string(),
                link: resolve_href(link.value().attr("href").unwrap_or_default(), base),
            })
        })
        .collect()
}

fn resolve_href(href: &str, base: Option<&Url>) -> String {
    if href.is_empty() {
        return String::new();
    }
    base.and_then(|b| b.join(href).ok())
        .map_or_else(|| href.to_string(), String::from)
}

fn full_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn first_line(element: ElementRef<'_>) -> String {
    rendered_text(element)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Text as displayed: inline markup joins, `<br>` and block elements break lines.
fn rendered_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if matches!(el.name(), "br" | "div" | "p" | "tr" | "li") => {
                text.push('\n');
            }
            _ => {}
        }
    }
    text
}
