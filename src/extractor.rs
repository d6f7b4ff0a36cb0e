use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::config::SelectorConfig;
use crate::models::{ProductRecord, UNKNOWN_PRICE};
use crate::utils::error::{AppError, Result};

/// Result of one pass over a listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<ProductRecord>,
    /// Item containers dropped because they had no usable name.
    pub unnamed_items: usize,
}

/// Turns listing-page markup into per-product availability records.
///
/// Selectors are compiled once; extraction itself is pure and never fails.
/// Malformed items are dropped rather than reported as errors.
#[derive(Debug, Clone)]
pub struct AvailabilityExtractor {
    listing: Selector,
    item: Selector,
    name: Selector,
    out_of_stock_marker: Selector,
    out_of_stock_class: String,
    link: Selector,
    price: Selector,
}

fn compile(field: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

/// Concatenated text of an element with runs of whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

impl AvailabilityExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            listing: compile("listing", &selectors.listing)?,
            item: compile("item", &selectors.item)?,
            name: compile("name", &selectors.name)?,
            out_of_stock_marker: compile("out_of_stock_marker", &selectors.out_of_stock_marker)?,
            out_of_stock_class: selectors.out_of_stock_class.clone(),
            link: compile("link", &selectors.link)?,
            price: compile("price", &selectors.price)?,
        })
    }

    pub fn extract(&self, markup: &str) -> Vec<ProductRecord> {
        self.extract_with_report(markup).records
    }

    /// Extract records in document order, also counting nameless items so
    /// the caller can warn about them.
    pub fn extract_with_report(&self, markup: &str) -> Extraction {
        let document = Html::parse_document(markup);
        let mut extraction = Extraction::default();
        // Nested listing containers would otherwise yield the same item twice.
        let mut seen = HashSet::new();

        for listing in document.select(&self.listing) {
            for item in listing.select(&self.item) {
                if !seen.insert(item.id()) {
                    continue;
                }
                match self.extract_item(item) {
                    Some(record) => extraction.records.push(record),
                    None => extraction.unnamed_items += 1,
                }
            }
        }

        extraction
    }

    fn extract_item(&self, item: ElementRef<'_>) -> Option<ProductRecord> {
        let name = item
            .select(&self.name)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())?;

        let has_marker = item.select(&self.out_of_stock_marker).next().is_some();
        let has_class = item.value().classes().any(|class| class == self.out_of_stock_class);

        let detail_url = item
            .select(&self.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string);

        let price = item
            .select(&self.price)
            .next()
            .map(element_text)
            .filter(|price| !price.is_empty())
            .unwrap_or_else(|| UNKNOWN_PRICE.to_string());

        Some(ProductRecord {
            name,
            in_stock: !has_marker && !has_class,
            detail_url,
            price,
        })
    }
}
