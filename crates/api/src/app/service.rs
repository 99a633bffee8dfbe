//! Catalog service: the operation surface offered to the transport.
//!
//! Shape validation runs here, strictly before any storage call; a failing
//! request never opens a transaction. The store is injected as a trait
//! object so the same service runs over Postgres or the in-memory backend.

use std::sync::Arc;

use tracing::instrument;

use kilim_catalog::{Carpet, ProductDraft, ProductRecord, ProductRevision};
use kilim_core::{CatalogError, CatalogResult, CompanyId, ProductId};
use kilim_infra::CatalogStore;

pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Create a product and reply with the company's full live listing.
    #[instrument(
        skip(self, draft),
        fields(company_id = %draft.company_id, design_code = %draft.design_code),
        err
    )]
    pub async fn create_new_product(
        &self,
        draft: ProductDraft,
    ) -> CatalogResult<Vec<ProductRecord>> {
        draft.validate()?;
        let created = self.store.create_product(&draft).await?;
        self.store.products_for_company(created.company_id).await
    }

    /// Replace the product's scalars and both value sets with the revision.
    #[instrument(skip(self, revision), fields(product_id = %revision.product_id), err)]
    pub async fn edit_product(&self, revision: ProductRevision) -> CatalogResult<ProductRecord> {
        revision.validate()?;
        self.store.edit_product(&revision).await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn product_with_id(&self, product_id: ProductId) -> CatalogResult<ProductRecord> {
        if product_id.is_zero() {
            return Err(CatalogError::InvalidProduct);
        }
        self.store.product_by_id(product_id).await
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn delete_product(&self, product_id: ProductId) -> CatalogResult<()> {
        if product_id.is_zero() {
            return Err(CatalogError::InvalidProduct);
        }
        self.store.delete_product(product_id).await
    }

    #[instrument(skip(self), fields(company_id = %company_id), err)]
    pub async fn all_products(&self, company_id: CompanyId) -> CatalogResult<Vec<ProductRecord>> {
        if company_id.is_zero() {
            return Err(CatalogError::InvalidCompany);
        }
        self.store.products_for_company(company_id).await
    }

    /// Every sellable variant of the company.
    #[instrument(skip(self), fields(company_id = %company_id), err)]
    pub async fn list_carpets(&self, company_id: CompanyId) -> CatalogResult<Vec<Carpet>> {
        if company_id.is_zero() {
            return Err(CatalogError::InvalidCompany);
        }
        self.store.carpets_for_company(company_id).await
    }

    /// The company's variants narrowed to one product.
    #[instrument(skip(self), fields(company_id = %company_id, product_id = %product_id), err)]
    pub async fn list_carpets_for_product(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Carpet>> {
        if company_id.is_zero() {
            return Err(CatalogError::InvalidCompany);
        }
        if product_id.is_zero() {
            return Err(CatalogError::InvalidProduct);
        }
        self.store.carpets_for_product(company_id, product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kilim_infra::MemoryCatalogStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryCatalogStore::new()))
    }

    fn draft(company: i64, design_code: &str) -> ProductDraft {
        ProductDraft {
            company_id: CompanyId::new(company),
            design_code: design_code.to_string(),
            description: "hand knotted wool".to_string(),
            sizes: strings(&["6", "9"]),
            colors: strings(&["red", "blue"]),
        }
    }

    #[tokio::test]
    async fn create_rejects_a_zero_company_before_the_store() {
        let service = service();
        let err = service.create_new_product(draft(0, "KL-100")).await.unwrap_err();
        // The store has no zero-company rule, so the kind proves the
        // validation layer answered.
        assert_eq!(err, CatalogError::InvalidCompany);
    }

    #[tokio::test]
    async fn create_rejects_blank_and_duplicate_values_as_invalid_product() {
        let service = service();

        let mut blank = draft(7, "KL-100");
        blank.sizes = strings(&["6", "  "]);
        let err = service.create_new_product(blank).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);

        let mut repeated = draft(7, "KL-100");
        repeated.colors = strings(&["red", "red"]);
        let err = service.create_new_product(repeated).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);

        let mut empty = draft(7, "KL-100");
        empty.sizes = Vec::new();
        let err = service.create_new_product(empty).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);

        // Nothing reached storage.
        let err = service.all_products(CompanyId::new(7)).await.unwrap_err();
        assert_eq!(err, CatalogError::ProductNotFound);
    }

    #[tokio::test]
    async fn create_replies_with_the_full_company_listing() {
        let service = service();

        let listing = service.create_new_product(draft(7, "KL-100")).await.unwrap();
        assert_eq!(listing.len(), 1);

        let listing = service.create_new_product(draft(7, "KL-200")).await.unwrap();
        assert_eq!(listing.len(), 2);
        let codes: Vec<&str> = listing.iter().map(|p| p.design_code.as_str()).collect();
        assert_eq!(codes, vec!["KL-100", "KL-200"]);
    }

    #[tokio::test]
    async fn edit_requires_a_target_product_id() {
        let service = service();
        let listing = service.create_new_product(draft(7, "KL-100")).await.unwrap();
        let record = &listing[0];

        let revision = ProductRevision {
            product_id: ProductId::new(0),
            company_id: record.company_id,
            design_code: record.design_code.clone(),
            description: record.description.clone(),
            sizes: strings(&["6"]),
            colors: strings(&["red"]),
        };
        let err = service.edit_product(revision).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);
    }

    #[tokio::test]
    async fn zero_ids_are_rejected_per_operation() {
        let service = service();

        let err = service.product_with_id(ProductId::new(0)).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);

        let err = service.delete_product(ProductId::new(0)).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);

        let err = service.all_products(CompanyId::new(0)).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidCompany);

        let err = service.list_carpets(CompanyId::new(0)).await.unwrap_err();
        assert_eq!(err, CatalogError::InvalidCompany);

        let err = service
            .list_carpets_for_product(CompanyId::new(7), ProductId::new(0))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::InvalidProduct);
    }

    #[tokio::test]
    async fn carpets_flow_through_for_a_valid_company() {
        let service = service();
        let listing = service.create_new_product(draft(7, "KL-100")).await.unwrap();

        let carpets = service.list_carpets(CompanyId::new(7)).await.unwrap();
        assert_eq!(carpets.len(), 4);

        let carpets = service
            .list_carpets_for_product(CompanyId::new(7), listing[0].id)
            .await
            .unwrap();
        assert_eq!(carpets.len(), 4);
    }
}
