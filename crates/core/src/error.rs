//! Catalog error model.

use thiserror::Error;

/// Result type used across the catalog layers.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Error taxonomy shared by the domain, the stores, and the transport.
///
/// Keep this focused on deterministic, caller-visible failures. Storage
/// faults are wrapped into [`CatalogError::Internal`] at the repository
/// boundary so callers never see raw database errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Product shape failed validation (blank design code, empty or
    /// duplicated attribute lists, wrong id presence for the call).
    #[error("invalid_product")]
    InvalidProduct,

    /// Company id was zero or otherwise unusable.
    #[error("invalid_company")]
    InvalidCompany,

    /// Size list rejected before any diff or write (e.g. empty desired set).
    #[error("invalid_dimension")]
    InvalidDimension,

    /// Color list rejected before any diff or write.
    #[error("invalid_theme")]
    InvalidTheme,

    /// Product absent or already soft-deleted.
    #[error("product_not_found")]
    ProductNotFound,

    /// Dimension row absent for the addressed product.
    #[error("dimension_not_found")]
    DimensionNotFound,

    /// Theme row absent for the addressed product.
    #[error("theme_not_found")]
    ThemeNotFound,

    /// Unique-constraint collision: (company, design code) on products,
    /// (product, value) on dimensions/themes.
    #[error("duplicate_key: {0}")]
    DuplicateKey(String),

    /// Transport payload could not be decoded.
    #[error("bad_request")]
    BadRequest,

    /// Opcode known to the envelope but not wired to a service method.
    #[error("not_implemented")]
    NotImplemented,

    /// Caller-supplied deadline expired; the in-flight transaction was
    /// dropped without committing.
    #[error("time_out")]
    Timeout,

    /// Storage or connectivity failure, including a missing per-company
    /// carpet view.
    #[error("internal_server: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    /// Envelope status code (HTTP-style numeric).
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidProduct
            | Self::InvalidCompany
            | Self::InvalidDimension
            | Self::InvalidTheme
            | Self::BadRequest => 400,
            Self::ProductNotFound | Self::DimensionNotFound | Self::ThemeNotFound => 404,
            Self::DuplicateKey(_) => 409,
            Self::Internal(_) => 500,
            Self::NotImplemented => 501,
            Self::Timeout => 504,
        }
    }

    /// Bare envelope message, without the detail Display appends.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::InvalidProduct => "invalid_product",
            Self::InvalidCompany => "invalid_company",
            Self::InvalidDimension => "invalid_dimension",
            Self::InvalidTheme => "invalid_theme",
            Self::ProductNotFound => "product_not_found",
            Self::DimensionNotFound => "dimension_not_found",
            Self::ThemeNotFound => "theme_not_found",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::BadRequest => "bad_request",
            Self::NotImplemented => "not_implemented",
            Self::Timeout => "time_out",
            Self::Internal(_) => "internal_server",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound | Self::DimensionNotFound | Self::ThemeNotFound
        )
    }
}
