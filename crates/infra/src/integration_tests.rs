//! Integration tests for complete catalog scenarios.
//!
//! Exercises the in-memory backend end to end through the storage trait:
//! create, full-aggregate edit, collection maintenance, carpet enumeration,
//! delete. The Postgres backend shares these contracts behind the same
//! trait surface.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use kilim_catalog::{ProductDraft, ProductRevision};
    use kilim_core::{CatalogError, CompanyId};

    use crate::store::{CatalogStore, MemoryCatalogStore};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn draft(company: CompanyId, design_code: &str) -> ProductDraft {
        ProductDraft {
            company_id: company,
            design_code: design_code.to_string(),
            description: "hand knotted wool".to_string(),
            sizes: strings(&["6", "9"]),
            colors: strings(&["red", "blue"]),
        }
    }

    #[tokio::test]
    async fn full_product_lifecycle() {
        let store = MemoryCatalogStore::new();
        let company = CompanyId::new(7);

        let record = store.create_product(&draft(company, "KL-100")).await.unwrap();
        let listing = store.products_for_company(company).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0], record);

        let edited = store
            .edit_product(&ProductRevision {
                product_id: record.id,
                company_id: company,
                design_code: "KL-100R".to_string(),
                description: "hand knotted wool, revised".to_string(),
                sizes: strings(&["9", "12"]),
                colors: strings(&["red", "blue"]),
            })
            .await
            .unwrap();
        assert_eq!(edited.design_code, "KL-100R");
        assert_eq!(edited.sizes().collect::<Vec<_>>(), vec!["9", "12"]);

        store.add_dimensions(record.id, &strings(&["15"])).await.unwrap();
        store
            .remove_dimensions_by_size(record.id, &strings(&["9"]))
            .await
            .unwrap();
        let sizes: Vec<String> = store
            .dimensions_for_product(record.id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.size)
            .collect();
        assert_eq!(sizes, strings(&["12", "15"]));

        let carpets = store.carpets_for_company(company).await.unwrap();
        assert_eq!(carpets.len(), 4);

        store.delete_product(record.id).await.unwrap();
        let err = store.product_by_id(record.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound));
        assert!(store.carpets_for_company(company).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_edits_resolve_to_exactly_one_revision() {
        let store = MemoryCatalogStore::new();
        let company = CompanyId::new(7);
        let record = store.create_product(&draft(company, "KL-100")).await.unwrap();

        let rev_a = ProductRevision {
            product_id: record.id,
            company_id: company,
            design_code: "KL-A".to_string(),
            description: "revision a".to_string(),
            sizes: strings(&["6", "9"]),
            colors: strings(&["red"]),
        };
        let rev_b = ProductRevision {
            product_id: record.id,
            company_id: company,
            design_code: "KL-B".to_string(),
            description: "revision b".to_string(),
            sizes: strings(&["12"]),
            colors: strings(&["green", "blue"]),
        };

        let (a, b) = tokio::join!(store.edit_product(&rev_a), store.edit_product(&rev_b));
        a.unwrap();
        b.unwrap();

        // Whichever edit landed last owns the whole aggregate; the value
        // sets never mix across revisions.
        let after = store.product_by_id(record.id).await.unwrap();
        let sizes: BTreeSet<String> = after.sizes().map(str::to_string).collect();
        let colors: BTreeSet<String> = after.colors().map(str::to_string).collect();
        if after.design_code == "KL-A" {
            assert_eq!(sizes, set(&["6", "9"]));
            assert_eq!(colors, set(&["red"]));
        } else {
            assert_eq!(after.design_code, "KL-B");
            assert_eq!(sizes, set(&["12"]));
            assert_eq!(colors, set(&["green", "blue"]));
        }
    }

    #[tokio::test]
    async fn carpet_listing_tracks_collection_changes() {
        let store = MemoryCatalogStore::new();
        let company = CompanyId::new(7);
        let record = store.create_product(&draft(company, "KL-100")).await.unwrap();

        let carpets = store.carpets_for_product(company, record.id).await.unwrap();
        assert_eq!(carpets.len(), 4);

        store.add_themes(record.id, &strings(&["green"])).await.unwrap();
        let carpets = store.carpets_for_product(company, record.id).await.unwrap();
        assert_eq!(carpets.len(), 6);

        store
            .remove_dimensions_by_size(record.id, &strings(&["6"]))
            .await
            .unwrap();
        let carpets = store.carpets_for_product(company, record.id).await.unwrap();
        assert_eq!(carpets.len(), 3);

        let pairs: Vec<(String, String)> = carpets
            .into_iter()
            .map(|c| (c.size, c.color))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("9".to_string(), "red".to_string()),
                ("9".to_string(), "blue".to_string()),
                ("9".to_string(), "green".to_string()),
            ]
        );
    }
}
