use serde::{Deserialize, Serialize};

use kilim_core::{DimensionId, ProductId, ThemeId};

use crate::product::ProductRecord;

/// A sellable variant: one (dimension, theme) pair under one product.
///
/// Carpets are derived, never stored or mutated. The synthetic id encodes
/// the three row identities that produced the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carpet {
    pub id: String,
    pub product_id: ProductId,
    pub dimension_id: DimensionId,
    pub theme_id: ThemeId,
    pub design_code: String,
    pub size: String,
    pub color: String,
}

impl Carpet {
    /// Synthetic identifier: `<product>-<dimension>-<theme>`.
    pub fn synthetic_id(product: ProductId, dimension: DimensionId, theme: ThemeId) -> String {
        format!("{product}-{dimension}-{theme}")
    }

    /// Enumerate every variant of one product: the cross product of its
    /// dimensions and themes, dimension-major. A product missing either
    /// collection yields no variants.
    pub fn enumerate(product: &ProductRecord) -> Vec<Carpet> {
        let mut carpets = Vec::with_capacity(product.dimensions.len() * product.themes.len());
        for dimension in &product.dimensions {
            for theme in &product.themes {
                carpets.push(Carpet {
                    id: Self::synthetic_id(product.id, dimension.id, theme.id),
                    product_id: product.id,
                    dimension_id: dimension.id,
                    theme_id: theme.id,
                    design_code: product.design_code.clone(),
                    size: dimension.size.clone(),
                    color: theme.color.clone(),
                });
            }
        }
        carpets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Dimension, Theme};
    use chrono::Utc;
    use kilim_core::CompanyId;

    fn record(sizes: &[(i64, &str)], colors: &[(i64, &str)]) -> ProductRecord {
        let product_id = ProductId::new(3);
        ProductRecord {
            id: product_id,
            company_id: CompanyId::new(1),
            design_code: "104".to_string(),
            description: String::new(),
            dimensions: sizes
                .iter()
                .map(|&(id, size)| Dimension {
                    id: DimensionId::new(id),
                    product_id,
                    size: size.to_string(),
                })
                .collect(),
            themes: colors
                .iter()
                .map(|&(id, color)| Theme {
                    id: ThemeId::new(id),
                    product_id,
                    color: color.to_string(),
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn two_sizes_and_two_colors_yield_four_carpets() {
        let carpets = Carpet::enumerate(&record(&[(1, "6"), (2, "9")], &[(5, "red"), (6, "blue")]));
        assert_eq!(carpets.len(), 4);
        let ids: Vec<&str> = carpets.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["3-1-5", "3-1-6", "3-2-5", "3-2-6"]);
    }

    #[test]
    fn missing_colors_yield_no_carpets() {
        let carpets = Carpet::enumerate(&record(&[(1, "6"), (2, "9")], &[]));
        assert!(carpets.is_empty());
    }

    #[test]
    fn carpet_carries_the_pair_values() {
        let carpets = Carpet::enumerate(&record(&[(1, "6")], &[(5, "red")]));
        assert_eq!(carpets.len(), 1);
        assert_eq!(carpets[0].size, "6");
        assert_eq!(carpets[0].color, "red");
        assert_eq!(carpets[0].design_code, "104");
    }
}
