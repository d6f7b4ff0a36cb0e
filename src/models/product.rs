use serde::{Deserialize, Serialize};
use url::Url;

/// Price text used when a listing item carries no price element.
pub const UNKNOWN_PRICE: &str = "unknown";

/// One product as it appears on a single fetch of the listing page.
///
/// Records are rebuilt on every poll; nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub in_stock: bool,
    pub detail_url: Option<String>,
    pub price: String,
}

/// What a poll cycle should do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition<'a> {
    /// In stock with a link to the product page: send a notification.
    Notify { detail_url: &'a str },
    /// In stock but the markup carried no product link.
    MissingDetailUrl,
    OutOfStock,
}

impl ProductRecord {
    pub fn new(name: impl Into<String>, in_stock: bool) -> Self {
        Self {
            name: name.into(),
            in_stock,
            detail_url: None,
            price: UNKNOWN_PRICE.to_string(),
        }
    }

    pub fn with_detail_url(mut self, url: impl Into<String>) -> Self {
        self.detail_url = Some(url.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    /// Make a relative product link absolute against the page it came from.
    /// Links that cannot be joined are left as they are.
    pub fn resolve_detail_url(&mut self, base: &Url) {
        let resolved = self
            .detail_url
            .as_deref()
            .filter(|href| !href.is_empty())
            .and_then(|href| base.join(href).ok());
        if let Some(url) = resolved {
            self.detail_url = Some(url.into());
        }
    }

    pub fn disposition(&self) -> Disposition<'_> {
        match (self.in_stock, self.detail_url.as_deref()) {
            (true, Some(detail_url)) if !detail_url.is_empty() => {
                Disposition::Notify { detail_url }
            }
            (true, _) => Disposition::MissingDetailUrl,
            (false, _) => Disposition::OutOfStock,
        }
    }
}
