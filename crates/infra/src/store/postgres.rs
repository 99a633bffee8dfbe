//! Postgres-backed catalog store.
//!
//! Persists product aggregates in three tables plus one derived view per
//! company. Soft delete is a `deleted_at` timestamp; every read filters
//! live rows and the uniqueness indexes are partial over live rows so a
//! deleted value can be re-added.
//!
//! ## Error Mapping
//!
//! SQLx errors are wrapped at this boundary so callers never see raw
//! database errors:
//!
//! | SQLSTATE | Mapped error | Scenario |
//! |----------|--------------|----------|
//! | `23505` | `DuplicateKey` | (company, design code) or (product, value) collision |
//! | `23503` | `ProductNotFound` | child insert referencing an absent product |
//! | `42P01` | `Internal` | per-company carpet view not provisioned |
//! | other | `Internal` | connectivity, pool exhaustion, unexpected row shapes |
//!
//! ## Transactions
//!
//! Multi-statement operations hold one transaction from first statement to
//! commit; early returns drop the transaction, which rolls it back. The
//! exception is `remove_*_by_id`: a single best-effort statement whose
//! applied deletions survive a count mismatch.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use kilim_catalog::{
    Carpet, Dimension, ProductDraft, ProductRecord, ProductRevision, ReconcilePlan, Theme,
    values_are_distinct,
};
use kilim_core::{CatalogError, CatalogResult, CompanyId, DimensionId, ProductId, ThemeId};

use super::{CatalogStore, DimensionRename, EmptyCompanyListing, ThemeRename};

/// Postgres-backed catalog store.
///
/// Holds an injected pool handle; never a process-wide connection. Cloning
/// is cheap and every clone shares the pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: Arc<PgPool>,
    empty_listing: EmptyCompanyListing,
}

impl PgCatalogStore {
    /// Create a store over the given connection pool with the default
    /// empty-listing policy.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            empty_listing: EmptyCompanyListing::default(),
        }
    }

    /// Override how an empty company listing is reported.
    pub fn with_empty_company_listing(mut self, policy: EmptyCompanyListing) -> Self {
        self.empty_listing = policy;
        self
    }

    /// Create tables and partial unique indexes if absent.
    ///
    /// Operator-invoked at startup; query paths never create schema.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> CatalogResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    /// Create or replace the derived carpet view for one company.
    ///
    /// View provisioning is an operational concern: the carpet queries
    /// assume the view exists and report `Internal` when it does not.
    #[instrument(skip(self), fields(company_id = %company_id), err)]
    pub async fn provision_company_view(&self, company_id: CompanyId) -> CatalogResult<()> {
        let view = company_view_name(company_id);
        // View names cannot be bound; the company id is numeric so the
        // interpolation is unambiguous.
        let sql = format!(
            r#"
            CREATE OR REPLACE VIEW {view} AS
            SELECT
                p.id::text || '-' || d.id::text || '-' || t.id::text AS id,
                p.id AS product_id,
                d.id AS dimension_id,
                t.id AS theme_id,
                p.design_code AS design_code,
                d.size AS size,
                t.color AS color
            FROM products p
            JOIN dimensions d ON d.product_id = p.id AND d.deleted_at IS NULL
            JOIN themes t ON t.product_id = p.id AND t.deleted_at IS NULL
            WHERE p.company_id = {company} AND p.deleted_at IS NULL
            "#,
            view = view,
            company = company_id.as_i64(),
        );
        sqlx::query(&sql)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("provision_company_view", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(
        skip(self, draft),
        fields(
            company_id = %draft.company_id,
            design_code = %draft.design_code,
            sizes = draft.sizes.len(),
            colors = draft.colors.len()
        ),
        err
    )]
    async fn create_product(&self, draft: &ProductDraft) -> CatalogResult<ProductRecord> {
        // Repeats would otherwise surface as a raw constraint error on the
        // second child insert.
        if !values_are_distinct(&draft.sizes) {
            return Err(CatalogError::duplicate_key("size list contains repeated values"));
        }
        if !values_are_distinct(&draft.colors) {
            return Err(CatalogError::duplicate_key("color list contains repeated values"));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (company_id, design_code, description)
            VALUES ($1, $2, $3)
            RETURNING id, company_id, design_code, description, created_at, updated_at
            "#,
        )
        .bind(draft.company_id.as_i64())
        .bind(&draft.design_code)
        .bind(&draft.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CatalogError::duplicate_key(format!(
                    "design code \"{}\" already used by company {}",
                    draft.design_code, draft.company_id
                ))
            } else {
                map_sqlx_error("insert_product", e)
            }
        })?;
        let product = ProductRow::from_row(&row)
            .map_err(|e| CatalogError::internal(format!("failed to read product row: {e}")))?;
        let product_id = ProductId::new(product.id);

        let mut dimensions = Vec::with_capacity(draft.sizes.len());
        for size in &draft.sizes {
            let id = insert_dimension(&mut tx, product_id, size).await?;
            dimensions.push(Dimension { id, product_id, size: size.clone() });
        }

        let mut themes = Vec::with_capacity(draft.colors.len());
        for color in &draft.colors {
            let id = insert_theme(&mut tx, product_id, color).await?;
            themes.push(Theme { id, product_id, color: color.clone() });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(product.into_record(dimensions, themes))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_by_id(&self, id: ProductId) -> CatalogResult<ProductRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let record = product_record_in_tx(&mut tx, id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(record)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let res = sqlx::query(
            "UPDATE products SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;
        if res.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(CatalogError::ProductNotFound);
        }

        // Cascade the soft delete to both child collections.
        sqlx::query(
            "UPDATE dimensions SET deleted_at = NOW() WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_product_dimensions", e))?;
        sqlx::query(
            "UPDATE themes SET deleted_at = NOW() WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_product_themes", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(company_id = %company_id), err)]
    async fn products_for_company(
        &self,
        company_id: CompanyId,
    ) -> CatalogResult<Vec<ProductRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, company_id, design_code, description, created_at, updated_at
            FROM products
            WHERE company_id = $1 AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(company_id.as_i64())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("products_for_company", e))?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let product = ProductRow::from_row(&row)
                .map_err(|e| CatalogError::internal(format!("failed to read product row: {e}")))?;
            products.push(product);
        }

        if products.is_empty() {
            return match self.empty_listing {
                EmptyCompanyListing::NotFound => Err(CatalogError::ProductNotFound),
                EmptyCompanyListing::Empty => Ok(Vec::new()),
            };
        }

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let mut dimensions: HashMap<i64, Vec<Dimension>> = HashMap::new();
        let dim_rows = sqlx::query(
            r#"
            SELECT id, product_id, size
            FROM dimensions
            WHERE product_id = ANY($1) AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("products_for_company_dimensions", e))?;
        for row in dim_rows {
            let dim = DimensionRow::from_row(&row)
                .map_err(|e| CatalogError::internal(format!("failed to read dimension row: {e}")))?;
            dimensions.entry(dim.product_id).or_default().push(dim.into());
        }

        let mut themes: HashMap<i64, Vec<Theme>> = HashMap::new();
        let theme_rows = sqlx::query(
            r#"
            SELECT id, product_id, color
            FROM themes
            WHERE product_id = ANY($1) AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("products_for_company_themes", e))?;
        for row in theme_rows {
            let theme = ThemeRow::from_row(&row)
                .map_err(|e| CatalogError::internal(format!("failed to read theme row: {e}")))?;
            themes.entry(theme.product_id).or_default().push(theme.into());
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(products
            .into_iter()
            .map(|p| {
                let dims = dimensions.remove(&p.id).unwrap_or_default();
                let thms = themes.remove(&p.id).unwrap_or_default();
                p.into_record(dims, thms)
            })
            .collect())
    }

    #[instrument(
        skip(self, revision),
        fields(
            product_id = %revision.product_id,
            design_code = %revision.design_code,
            sizes = revision.sizes.len(),
            colors = revision.colors.len()
        ),
        err
    )]
    async fn edit_product(&self, revision: &ProductRevision) -> CatalogResult<ProductRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Phase one: the product must exist live.
        require_live_product(&mut tx, revision.product_id).await?;

        // Phase two: scalar update. Always touches updated_at, so a no-op
        // revision still bumps the aggregate timestamp.
        sqlx::query(
            r#"
            UPDATE products
            SET design_code = $2, description = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(revision.product_id.as_i64())
        .bind(&revision.design_code)
        .bind(&revision.description)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CatalogError::duplicate_key(format!(
                    "design code \"{}\" already used by another product of the company",
                    revision.design_code
                ))
            } else {
                map_sqlx_error("edit_product_scalars", e)
            }
        })?;

        // Phase three: reconcile both child collections.
        reconcile_dimensions_in_tx(&mut tx, revision.product_id, &revision.sizes).await?;
        reconcile_themes_in_tx(&mut tx, revision.product_id, &revision.colors).await?;

        let record = product_record_in_tx(&mut tx, revision.product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(record)
    }

    #[instrument(skip(self, sizes), fields(product_id = %product_id, count = sizes.len()), err)]
    async fn add_dimensions(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<Vec<Dimension>> {
        if sizes.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        // The foreign key alone would accept a soft-deleted owner.
        require_live_product(&mut tx, product_id).await?;
        let mut rows = Vec::with_capacity(sizes.len());
        for size in sizes {
            let id = insert_dimension(&mut tx, product_id, size).await?;
            rows.push(Dimension { id, product_id, size: size.clone() });
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(rows)
    }

    #[instrument(skip(self, sizes), fields(product_id = %product_id, count = sizes.len()), err)]
    async fn remove_dimensions_by_size(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<()> {
        if sizes.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for size in sizes {
            let res = sqlx::query(
                r#"
                UPDATE dimensions SET deleted_at = NOW()
                WHERE product_id = $1 AND size = $2 AND deleted_at IS NULL
                "#,
            )
            .bind(product_id.as_i64())
            .bind(size)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_dimensions_by_size", e))?;
            if res.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(CatalogError::DimensionNotFound);
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(product_id = %product_id, count = ids.len()), err)]
    async fn remove_dimensions_by_id(
        &self,
        product_id: ProductId,
        ids: &[DimensionId],
    ) -> CatalogResult<()> {
        if ids.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }

        // One best-effort statement: rows it deleted stay deleted, the
        // count mismatch only decides the reply.
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let res = sqlx::query(
            r#"
            UPDATE dimensions SET deleted_at = NOW()
            WHERE product_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.as_i64())
        .bind(&raw)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_dimensions_by_id", e))?;
        if res.rows_affected() as usize != ids.len() {
            return Err(CatalogError::DimensionNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, renames), fields(count = renames.len()), err)]
    async fn rename_dimensions(&self, renames: &[DimensionRename]) -> CatalogResult<()> {
        if renames.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for rename in renames {
            let res = sqlx::query(
                r#"
                UPDATE dimensions SET size = $1, updated_at = NOW()
                WHERE id = $2 AND product_id = $3 AND deleted_at IS NULL
                "#,
            )
            .bind(&rename.size)
            .bind(rename.id.as_i64())
            .bind(rename.product_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CatalogError::duplicate_key(format!(
                        "size \"{}\" already present for product {}",
                        rename.size, rename.product_id
                    ))
                } else {
                    map_sqlx_error("rename_dimensions", e)
                }
            })?;
            if res.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(CatalogError::DimensionNotFound);
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn dimensions_for_product(
        &self,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Dimension>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, size
            FROM dimensions
            WHERE product_id = $1 AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dimensions_for_product", e))?;

        let mut dimensions = Vec::with_capacity(rows.len());
        for row in rows {
            let dim = DimensionRow::from_row(&row)
                .map_err(|e| CatalogError::internal(format!("failed to read dimension row: {e}")))?;
            dimensions.push(dim.into());
        }
        Ok(dimensions)
    }

    #[instrument(skip(self, colors), fields(product_id = %product_id, count = colors.len()), err)]
    async fn add_themes(
        &self,
        product_id: ProductId,
        colors: &[String],
    ) -> CatalogResult<Vec<Theme>> {
        if colors.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        require_live_product(&mut tx, product_id).await?;
        let mut rows = Vec::with_capacity(colors.len());
        for color in colors {
            let id = insert_theme(&mut tx, product_id, color).await?;
            rows.push(Theme { id, product_id, color: color.clone() });
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(rows)
    }

    #[instrument(skip(self, colors), fields(product_id = %product_id, count = colors.len()), err)]
    async fn remove_themes_by_color(
        &self,
        product_id: ProductId,
        colors: &[String],
    ) -> CatalogResult<()> {
        if colors.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for color in colors {
            let res = sqlx::query(
                r#"
                UPDATE themes SET deleted_at = NOW()
                WHERE product_id = $1 AND color = $2 AND deleted_at IS NULL
                "#,
            )
            .bind(product_id.as_i64())
            .bind(color)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_themes_by_color", e))?;
            if res.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(CatalogError::ThemeNotFound);
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(product_id = %product_id, count = ids.len()), err)]
    async fn remove_themes_by_id(
        &self,
        product_id: ProductId,
        ids: &[ThemeId],
    ) -> CatalogResult<()> {
        if ids.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }

        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let res = sqlx::query(
            r#"
            UPDATE themes SET deleted_at = NOW()
            WHERE product_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(product_id.as_i64())
        .bind(&raw)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_themes_by_id", e))?;
        if res.rows_affected() as usize != ids.len() {
            return Err(CatalogError::ThemeNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, renames), fields(count = renames.len()), err)]
    async fn rename_themes(&self, renames: &[ThemeRename]) -> CatalogResult<()> {
        if renames.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        for rename in renames {
            let res = sqlx::query(
                r#"
                UPDATE themes SET color = $1, updated_at = NOW()
                WHERE id = $2 AND product_id = $3 AND deleted_at IS NULL
                "#,
            )
            .bind(&rename.color)
            .bind(rename.id.as_i64())
            .bind(rename.product_id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CatalogError::duplicate_key(format!(
                        "color \"{}\" already present for product {}",
                        rename.color, rename.product_id
                    ))
                } else {
                    map_sqlx_error("rename_themes", e)
                }
            })?;
            if res.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(CatalogError::ThemeNotFound);
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn themes_for_product(&self, product_id: ProductId) -> CatalogResult<Vec<Theme>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, color
            FROM themes
            WHERE product_id = $1 AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("themes_for_product", e))?;

        let mut themes = Vec::with_capacity(rows.len());
        for row in rows {
            let theme = ThemeRow::from_row(&row)
                .map_err(|e| CatalogError::internal(format!("failed to read theme row: {e}")))?;
            themes.push(theme.into());
        }
        Ok(themes)
    }

    #[instrument(skip(self), fields(company_id = %company_id), err)]
    async fn carpets_for_company(&self, company_id: CompanyId) -> CatalogResult<Vec<Carpet>> {
        let view = company_view_name(company_id);
        let sql = format!(
            "SELECT id, product_id, dimension_id, theme_id, design_code, size, color \
             FROM {view} ORDER BY product_id, dimension_id, theme_id"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("carpets_for_company", e))?;
        collect_carpets(rows)
    }

    #[instrument(skip(self), fields(company_id = %company_id, product_id = %product_id), err)]
    async fn carpets_for_product(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Carpet>> {
        let view = company_view_name(company_id);
        let sql = format!(
            "SELECT id, product_id, dimension_id, theme_id, design_code, size, color \
             FROM {view} WHERE product_id = $1 ORDER BY dimension_id, theme_id"
        );
        let rows = sqlx::query(&sql)
            .bind(product_id.as_i64())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("carpets_for_product", e))?;
        collect_carpets(rows)
    }
}

fn company_view_name(company_id: CompanyId) -> String {
    format!("view_carpet_company_{}", company_id.as_i64())
}

fn collect_carpets(rows: Vec<sqlx::postgres::PgRow>) -> CatalogResult<Vec<Carpet>> {
    let mut carpets = Vec::with_capacity(rows.len());
    for row in rows {
        let carpet = CarpetRow::from_row(&row)
            .map_err(|e| CatalogError::internal(format!("failed to read carpet row: {e}")))?;
        carpets.push(carpet.into());
    }
    Ok(carpets)
}

/// Fail with `ProductNotFound` unless the product exists live.
async fn require_live_product(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> CatalogResult<()> {
    let row = sqlx::query("SELECT id FROM products WHERE id = $1 AND deleted_at IS NULL")
        .bind(product_id.as_i64())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("require_live_product", e))?;
    if row.is_none() {
        return Err(CatalogError::ProductNotFound);
    }
    Ok(())
}

/// Insert one dimension row, mapping value collisions to `DuplicateKey`.
async fn insert_dimension(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    size: &str,
) -> CatalogResult<DimensionId> {
    let row = sqlx::query("INSERT INTO dimensions (product_id, size) VALUES ($1, $2) RETURNING id")
        .bind(product_id.as_i64())
        .bind(size)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CatalogError::duplicate_key(format!(
                    "size \"{size}\" already present for product {product_id}"
                ))
            } else {
                map_sqlx_error("insert_dimension", e)
            }
        })?;
    let id: i64 = row
        .try_get("id")
        .map_err(|e| CatalogError::internal(format!("failed to read inserted dimension id: {e}")))?;
    Ok(DimensionId::new(id))
}

/// Insert one theme row, mapping value collisions to `DuplicateKey`.
async fn insert_theme(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    color: &str,
) -> CatalogResult<ThemeId> {
    let row = sqlx::query("INSERT INTO themes (product_id, color) VALUES ($1, $2) RETURNING id")
        .bind(product_id.as_i64())
        .bind(color)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CatalogError::duplicate_key(format!(
                    "color \"{color}\" already present for product {product_id}"
                ))
            } else {
                map_sqlx_error("insert_theme", e)
            }
        })?;
    let id: i64 = row
        .try_get("id")
        .map_err(|e| CatalogError::internal(format!("failed to read inserted theme id: {e}")))?;
    Ok(ThemeId::new(id))
}

/// Load one live product with children inside the caller's transaction.
async fn product_record_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> CatalogResult<Option<ProductRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, company_id, design_code, description, created_at, updated_at
        FROM products
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(product_id.as_i64())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_product", e))?;

    let Some(row) = row else {
        return Ok(None);
    };
    let product = ProductRow::from_row(&row)
        .map_err(|e| CatalogError::internal(format!("failed to read product row: {e}")))?;

    let dimensions = dimension_rows_in_tx(tx, product_id).await?;
    let themes = theme_rows_in_tx(tx, product_id).await?;
    Ok(Some(product.into_record(dimensions, themes)))
}

async fn dimension_rows_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> CatalogResult<Vec<Dimension>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, size
        FROM dimensions
        WHERE product_id = $1 AND deleted_at IS NULL
        ORDER BY id ASC
        "#,
    )
    .bind(product_id.as_i64())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_dimensions", e))?;

    let mut dimensions = Vec::with_capacity(rows.len());
    for row in rows {
        let dim = DimensionRow::from_row(&row)
            .map_err(|e| CatalogError::internal(format!("failed to read dimension row: {e}")))?;
        dimensions.push(dim.into());
    }
    Ok(dimensions)
}

async fn theme_rows_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
) -> CatalogResult<Vec<Theme>> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, color
        FROM themes
        WHERE product_id = $1 AND deleted_at IS NULL
        ORDER BY id ASC
        "#,
    )
    .bind(product_id.as_i64())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_themes", e))?;

    let mut themes = Vec::with_capacity(rows.len());
    for row in rows {
        let theme = ThemeRow::from_row(&row)
            .map_err(|e| CatalogError::internal(format!("failed to read theme row: {e}")))?;
        themes.push(theme.into());
    }
    Ok(themes)
}

/// Reconcile the stored dimension set against the desired size list.
///
/// Deletes are applied before inserts, both inside the caller's
/// transaction. An empty desired list is rejected before any diff.
async fn reconcile_dimensions_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    desired: &[String],
) -> CatalogResult<()> {
    if desired.is_empty() {
        return Err(CatalogError::InvalidDimension);
    }

    let existing = dimension_rows_in_tx(tx, product_id).await?;
    let plan = ReconcilePlan::between(existing.iter().map(|d| (d.id, d.size.as_str())), desired);

    if !plan.delete.is_empty() {
        let ids: Vec<i64> = plan.delete.iter().map(|id| id.as_i64()).collect();
        sqlx::query("UPDATE dimensions SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(&ids)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("reconcile_dimensions_delete", e))?;
    }
    for size in &plan.insert {
        insert_dimension(tx, product_id, size).await?;
    }
    Ok(())
}

/// Theme counterpart of [`reconcile_dimensions_in_tx`].
async fn reconcile_themes_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    desired: &[String],
) -> CatalogResult<()> {
    if desired.is_empty() {
        return Err(CatalogError::InvalidTheme);
    }

    let existing = theme_rows_in_tx(tx, product_id).await?;
    let plan = ReconcilePlan::between(existing.iter().map(|t| (t.id, t.color.as_str())), desired);

    if !plan.delete.is_empty() {
        let ids: Vec<i64> = plan.delete.iter().map(|id| id.as_i64()).collect();
        sqlx::query("UPDATE themes SET deleted_at = NOW() WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(&ids)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("reconcile_themes_delete", e))?;
    }
    for color in &plan.insert {
        insert_theme(tx, product_id, color).await?;
    }
    Ok(())
}

/// Map SQLx errors to the catalog taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CatalogError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => CatalogError::DuplicateKey(msg),
                // Foreign key violation: the owning product is gone
                Some("23503") => CatalogError::ProductNotFound,
                // Undefined table: the per-company view was never provisioned
                Some("42P01") => CatalogError::Internal(msg),
                _ => CatalogError::Internal(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            CatalogError::internal(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            CatalogError::internal(format!("unexpected row not found in {operation}"))
        }
        _ => CatalogError::internal(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        company_id BIGINT NOT NULL,
        design_code TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS products_live_company_design
        ON products (company_id, design_code) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dimensions (
        id BIGSERIAL PRIMARY KEY,
        product_id BIGINT NOT NULL REFERENCES products (id),
        size TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS dimensions_live_product_size
        ON dimensions (product_id, size) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS themes (
        id BIGSERIAL PRIMARY KEY,
        product_id BIGINT NOT NULL REFERENCES products (id),
        color TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS themes_live_product_color
        ON themes (product_id, color) WHERE deleted_at IS NULL
    "#,
];

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    company_id: i64,
    design_code: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_record(self, dimensions: Vec<Dimension>, themes: Vec<Theme>) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(self.id),
            company_id: CompanyId::new(self.company_id),
            design_code: self.design_code,
            description: self.description,
            dimensions,
            themes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            company_id: row.try_get("company_id")?,
            design_code: row.try_get("design_code")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug)]
struct DimensionRow {
    id: i64,
    product_id: i64,
    size: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DimensionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(DimensionRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            size: row.try_get("size")?,
        })
    }
}

impl From<DimensionRow> for Dimension {
    fn from(row: DimensionRow) -> Self {
        Dimension {
            id: DimensionId::new(row.id),
            product_id: ProductId::new(row.product_id),
            size: row.size,
        }
    }
}

#[derive(Debug)]
struct ThemeRow {
    id: i64,
    product_id: i64,
    color: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ThemeRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ThemeRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            color: row.try_get("color")?,
        })
    }
}

impl From<ThemeRow> for Theme {
    fn from(row: ThemeRow) -> Self {
        Theme {
            id: ThemeId::new(row.id),
            product_id: ProductId::new(row.product_id),
            color: row.color,
        }
    }
}

#[derive(Debug)]
struct CarpetRow {
    id: String,
    product_id: i64,
    dimension_id: i64,
    theme_id: i64,
    design_code: String,
    size: String,
    color: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for CarpetRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(CarpetRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            dimension_id: row.try_get("dimension_id")?,
            theme_id: row.try_get("theme_id")?,
            design_code: row.try_get("design_code")?,
            size: row.try_get("size")?,
            color: row.try_get("color")?,
        })
    }
}

impl From<CarpetRow> for Carpet {
    fn from(row: CarpetRow) -> Self {
        Carpet {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            dimension_id: DimensionId::new(row.dimension_id),
            theme_id: ThemeId::new(row.theme_id),
            design_code: row.design_code,
            size: row.size,
            color: row.color,
        }
    }
}
