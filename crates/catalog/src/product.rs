use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kilim_core::{CatalogError, CatalogResult, CompanyId, DimensionId, ProductId, ThemeId};

/// A size row owned by exactly one product.
///
/// `(product_id, size)` is unique among live rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    pub product_id: ProductId,
    pub size: String,
}

/// A color row owned by exactly one product.
///
/// `(product_id, color)` is unique among live rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub product_id: ProductId,
    pub color: String,
}

/// Desired shape for aggregate creation. Row ids are assigned by the store,
/// never by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub company_id: CompanyId,
    pub design_code: String,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

/// Desired shape for a full-aggregate edit. The size and color lists are the
/// complete desired sets; the store reconciles them against the stored rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRevision {
    pub product_id: ProductId,
    pub company_id: CompanyId,
    pub design_code: String,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
}

/// A product hydrated with both child collections, children ordered by
/// ascending row id (creation order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub design_code: String,
    pub description: String,
    pub dimensions: Vec<Dimension>,
    pub themes: Vec<Theme>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn sizes(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.size.as_str())
    }

    pub fn colors(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|t| t.color.as_str())
    }
}

/// True when no value repeats. Comparison is exact (no trimming); blank
/// checks are a separate rule.
pub fn values_are_distinct(values: &[String]) -> bool {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v.as_str()))
}

fn shape_is_valid(
    company_id: CompanyId,
    design_code: &str,
    sizes: &[String],
    colors: &[String],
) -> CatalogResult<()> {
    if company_id.is_zero() {
        return Err(CatalogError::InvalidCompany);
    }
    if design_code.trim().is_empty() {
        return Err(CatalogError::InvalidProduct);
    }
    if sizes.is_empty() || colors.is_empty() {
        return Err(CatalogError::InvalidProduct);
    }
    if sizes.iter().any(|s| s.trim().is_empty()) {
        return Err(CatalogError::InvalidProduct);
    }
    if colors.iter().any(|c| c.trim().is_empty()) {
        return Err(CatalogError::InvalidProduct);
    }
    if !values_are_distinct(sizes) || !values_are_distinct(colors) {
        return Err(CatalogError::InvalidProduct);
    }
    Ok(())
}

impl ProductDraft {
    /// Shape validation run before any store call; a failing draft never
    /// opens a transaction.
    pub fn validate(&self) -> CatalogResult<()> {
        shape_is_valid(self.company_id, &self.design_code, &self.sizes, &self.colors)
    }
}

impl ProductRevision {
    /// Shape validation for edits: same rules as a draft, plus the target
    /// product id must be present.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.product_id.is_zero() {
            return Err(CatalogError::InvalidProduct);
        }
        shape_is_valid(self.company_id, &self.design_code, &self.sizes, &self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            company_id: CompanyId::new(1),
            design_code: "102".to_string(),
            description: "hand knotted".to_string(),
            sizes: vec!["6".to_string(), "9".to_string()],
            colors: vec!["red".to_string(), "blue".to_string()],
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn zero_company_is_invalid_company() {
        let mut d = draft();
        d.company_id = CompanyId::new(0);
        assert_eq!(d.validate(), Err(CatalogError::InvalidCompany));
    }

    #[test]
    fn blank_design_code_is_invalid_product() {
        let mut d = draft();
        d.design_code = "   ".to_string();
        assert_eq!(d.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn empty_size_list_is_invalid_product() {
        let mut d = draft();
        d.sizes.clear();
        assert_eq!(d.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn empty_color_list_is_invalid_product() {
        let mut d = draft();
        d.colors.clear();
        assert_eq!(d.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn blank_color_is_invalid_product() {
        let mut d = draft();
        d.colors.push(" ".to_string());
        assert_eq!(d.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn repeated_size_is_invalid_product() {
        let mut d = draft();
        d.sizes = vec!["6".to_string(), "9".to_string(), "6".to_string()];
        assert_eq!(d.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn revision_requires_product_id() {
        let d = draft();
        let rev = ProductRevision {
            product_id: ProductId::new(0),
            company_id: d.company_id,
            design_code: d.design_code,
            description: d.description,
            sizes: d.sizes,
            colors: d.colors,
        };
        assert_eq!(rev.validate(), Err(CatalogError::InvalidProduct));
    }

    #[test]
    fn distinct_check_does_not_trim() {
        // "6" and "6 " are different values; the blank rule is separate.
        assert!(values_are_distinct(&["6".to_string(), "6 ".to_string()]));
        assert!(!values_are_distinct(&["6".to_string(), "6".to_string()]));
    }
}
