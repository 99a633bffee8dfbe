//! Catalog storage backends.
//!
//! The [`CatalogStore`] trait is the transactional storage handle injected
//! into the service layer: [`PgCatalogStore`] persists to Postgres,
//! [`MemoryCatalogStore`] backs tests and local runs with the same
//! observable contracts.

mod memory;
mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

use async_trait::async_trait;

use kilim_catalog::{Carpet, Dimension, ProductDraft, ProductRecord, ProductRevision, Theme};
use kilim_core::{CatalogResult, CompanyId, DimensionId, ProductId, ThemeId};

/// Behavior of [`CatalogStore::products_for_company`] when a valid company
/// has no live products.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EmptyCompanyListing {
    /// Historical behavior: report the empty listing as `ProductNotFound`.
    #[default]
    NotFound,
    /// Report the empty listing as an empty vector.
    Empty,
}

/// A value rename addressed by row identity. Rows may span products; each
/// row's own product id scopes its update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionRename {
    pub id: DimensionId,
    pub product_id: ProductId,
    pub size: String,
}

/// Theme counterpart of [`DimensionRename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRename {
    pub id: ThemeId,
    pub product_id: ProductId,
    pub color: String,
}

/// Transactional catalog storage.
///
/// Every multi-row operation is all-or-nothing: a failure leaves the
/// aggregate exactly as before the call. The one documented exception is
/// `remove_*_by_id`, which deletes what it can and only then classifies a
/// count mismatch as not-found.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert the product row plus all dimension and theme rows as one
    /// transaction. Repeated values in either list, or a (company, design
    /// code) collision, fail with `DuplicateKey` and nothing persists.
    async fn create_product(&self, draft: &ProductDraft) -> CatalogResult<ProductRecord>;

    /// Load one live product hydrated with children in creation order.
    async fn product_by_id(&self, id: ProductId) -> CatalogResult<ProductRecord>;

    /// Soft-delete the product and cascade to its children. Zero affected
    /// rows (absent or already deleted) is `ProductNotFound`.
    async fn delete_product(&self, id: ProductId) -> CatalogResult<()>;

    /// Every live product of a company, fully hydrated. An empty result is
    /// reported per the store's [`EmptyCompanyListing`] policy.
    async fn products_for_company(&self, company_id: CompanyId)
    -> CatalogResult<Vec<ProductRecord>>;

    /// Three-phase edit in one transaction: existence check, scalar update,
    /// then reconciliation of both child collections against the revision's
    /// desired lists. Any phase failing rolls back the whole edit.
    async fn edit_product(&self, revision: &ProductRevision) -> CatalogResult<ProductRecord>;

    /// Bulk-insert sizes for a product. Empty input is `InvalidDimension`;
    /// any collision rolls back the entire batch.
    async fn add_dimensions(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<Vec<Dimension>>;

    /// Delete rows matching each size. The first size without a live row
    /// aborts the whole batch and reports `DimensionNotFound`.
    async fn remove_dimensions_by_size(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<()>;

    /// Delete rows by identity, best effort: every id found is deleted, and
    /// the call reports `DimensionNotFound` afterwards if the affected count
    /// differs from the requested count. Applied deletions are not undone.
    async fn remove_dimensions_by_id(
        &self,
        product_id: ProductId,
        ids: &[DimensionId],
    ) -> CatalogResult<()>;

    /// Rename sizes by row identity, transactionally; one failing row
    /// (absent, or colliding with a live value) aborts the whole batch.
    async fn rename_dimensions(&self, renames: &[DimensionRename]) -> CatalogResult<()>;

    /// Live dimension rows of a product, ascending id. An unknown product
    /// simply has none.
    async fn dimensions_for_product(&self, product_id: ProductId)
    -> CatalogResult<Vec<Dimension>>;

    /// Color counterpart of [`CatalogStore::add_dimensions`].
    async fn add_themes(&self, product_id: ProductId, colors: &[String])
    -> CatalogResult<Vec<Theme>>;

    /// Color counterpart of [`CatalogStore::remove_dimensions_by_size`].
    async fn remove_themes_by_color(
        &self,
        product_id: ProductId,
        colors: &[String],
    ) -> CatalogResult<()>;

    /// Color counterpart of [`CatalogStore::remove_dimensions_by_id`], with
    /// the same best-effort contract.
    async fn remove_themes_by_id(
        &self,
        product_id: ProductId,
        ids: &[ThemeId],
    ) -> CatalogResult<()>;

    /// Color counterpart of [`CatalogStore::rename_dimensions`].
    async fn rename_themes(&self, renames: &[ThemeRename]) -> CatalogResult<()>;

    /// Live theme rows of a product, ascending id.
    async fn themes_for_product(&self, product_id: ProductId) -> CatalogResult<Vec<Theme>>;

    /// Enumerate every variant for a company from its derived projection.
    async fn carpets_for_company(&self, company_id: CompanyId) -> CatalogResult<Vec<Carpet>>;

    /// Narrow the company's variants to one product. An unknown product has
    /// no variants.
    async fn carpets_for_product(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Carpet>>;
}
