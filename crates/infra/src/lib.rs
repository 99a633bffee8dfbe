//! Infrastructure layer: catalog storage backends.
//!
//! Two [`store::CatalogStore`] implementations: Postgres for production
//! and an in-memory table set for tests and storage-free runs. Both
//! enforce the same observable contracts; the service layer is written
//! against the trait and never names a backend.

pub mod store;

pub use store::{
    CatalogStore, DimensionRename, EmptyCompanyListing, MemoryCatalogStore, PgCatalogStore,
    ThemeRename,
};

#[cfg(test)]
mod integration_tests;
