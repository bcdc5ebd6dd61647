//! Occupancy counter extraction
//!
//! This module turns a fetched page into at most one reading:
//! - [`Page`] parses a response body into an HTML document
//! - [`ElementQuery`] and [`CounterElement`] are the only document operations used
//! - [`classify`] decides between a value, no value, or conflicting values
//!
//! Extraction never fails. A page without exactly one live, numeric counter value
//! yields no reading.

use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Element name and class identifying a counter widget
pub const COUNTER_NAME: &str = "app-counter";

/// Attribute marking a widget that shows a predicted value
pub const FORECAST_ATTR: &str = "forecast";

/// Attribute holding the displayed count
pub const VALUE_ATTR: &str = "value";

/// Errors that prevent a response from being treated as a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("response body is empty")]
    Empty,
}

/// An element attribute lookup
pub trait CounterElement {
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Finds elements by name
pub trait ElementQuery {
    type Element<'a>: CounterElement
    where
        Self: 'a;

    /// Returns every element with the given tag name or class
    fn find_all(&self, name: &str) -> Vec<Self::Element<'_>>;
}

/// A parsed HTML page
pub struct Page {
    html: Html,
}

impl Page {
    /// Parses an HTML body
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The parsed document
    /// * `Err(DocumentError::Empty)` - The body has no content
    ///
    /// # Example
    ///
    /// ```
    /// use occupancy_poller::poller::{extract, Page};
    ///
    /// let page = Page::parse(r#"<app-counter value="12"></app-counter>"#).unwrap();
    /// assert_eq!(extract(&page), Some(12));
    /// ```
    pub fn parse(body: &str) -> Result<Self, DocumentError> {
        if body.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        let html = Html::parse_document(body);
        if !html.errors.is_empty() {
            tracing::debug!("HTML parsed with {} recoverable errors", html.errors.len());
        }

        Ok(Self { html })
    }
}

impl CounterElement for ElementRef<'_> {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

impl ElementQuery for Page {
    type Element<'a> = ElementRef<'a>;

    fn find_all(&self, name: &str) -> Vec<ElementRef<'_>> {
        let css = format!("{name}, .{name}");
        let found = match Selector::parse(&css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                tracing::warn!("Invalid selector '{}': {:?}", css, e);
                Vec::new()
            }
        };
        found
    }
}

/// Outcome of looking for a live counter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Exactly one distinct live value, and it is a number
    Value(u32),

    /// No live counter carried a value
    NoCandidates,

    /// Live counters disagree
    Ambiguous(BTreeSet<String>),

    /// The single live value is not a non-negative integer
    Unparseable(String),
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Value(value) => write!(f, "value {}", value),
            Extraction::NoCandidates => write!(f, "no candidate values found"),
            Extraction::Ambiguous(values) => {
                let listed: Vec<&str> = values.iter().map(String::as_str).collect();
                write!(f, "multiple values found: {}", listed.join(", "))
            }
            Extraction::Unparseable(raw) => {
                write!(f, "value '{}' is not a non-negative integer", raw)
            }
        }
    }
}

/// True when the widget shows a forecast rather than the live count
///
/// An absent, empty, `false` or `0` marker means live.
fn is_forecast<E: CounterElement>(element: &E) -> bool {
    match element.attribute(FORECAST_ATTR).map(str::trim) {
        None => false,
        Some(marker) => !(marker.is_empty() || marker == "0" || marker.eq_ignore_ascii_case("false")),
    }
}

/// Classifies the counter values present in a document
pub fn classify<D: ElementQuery + ?Sized>(document: &D) -> Extraction {
    let counters = document.find_all(COUNTER_NAME);
    tracing::debug!("Found {} counter widgets", counters.len());

    let mut values = BTreeSet::new();
    for counter in counters.iter().filter(|c| !is_forecast(*c)) {
        match counter.attribute(VALUE_ATTR) {
            Some(value) => {
                values.insert(value.to_string());
            }
            None => tracing::warn!("Skipping counter widget without a value attribute"),
        }
    }

    if values.len() > 1 {
        return Extraction::Ambiguous(values);
    }

    match values.pop_first() {
        None => Extraction::NoCandidates,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(value) => Extraction::Value(value),
            Err(_) => Extraction::Unparseable(raw),
        },
    }
}

/// Extracts the live occupancy value from a document
///
/// Returns `None`, with a warning, unless the document holds exactly one distinct
/// live counter value that parses as a non-negative integer.
pub fn extract<D: ElementQuery + ?Sized>(document: &D) -> Option<u32> {
    match classify(document) {
        Extraction::Value(value) => Some(value),
        other => {
            tracing::warn!("No reading: {}", other);
            None
        }
    }
}
