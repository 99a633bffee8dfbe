//! `kilim-core` — catalog foundation building blocks.
//!
//! This crate contains the shared error taxonomy and the typed row
//! identifiers. No IO, no storage concerns.

pub mod error;
pub mod id;

pub use error::{CatalogError, CatalogResult};
pub use id::{CompanyId, DimensionId, ProductId, ThemeId};
