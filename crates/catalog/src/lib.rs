//! `kilim-catalog` — product catalog domain logic.
//!
//! This crate contains the aggregate records and drafts, the shape
//! validation rules, the value-set reconciler, and carpet enumeration,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod carpet;
pub mod product;
pub mod reconcile;

pub use carpet::Carpet;
pub use product::{
    Dimension, ProductDraft, ProductRecord, ProductRevision, Theme, values_are_distinct,
};
pub use reconcile::{ReconcilePlan, Resolution};
