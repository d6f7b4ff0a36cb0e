pub mod product;

// Re-exports for convenience
pub use product::*;

/// The synthetic product used by test mode to exercise the mail path
/// without fetching the storefront.
pub fn sample_restock() -> ProductRecord {
    ProductRecord::new("ZOTAC GAMING GeForce RTX 5090 SOLID OC", true)
        .with_detail_url("https://zotac.co.jp/product/zotac-gaming-geforce-rtx-5090-solid-oc/")
        .with_price("¥452,800（税込）")
}
