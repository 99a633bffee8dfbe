//! In-memory catalog store.
//!
//! Backs tests and storage-free local runs with the same observable
//! contracts as the Postgres store: value matching, batch atomicity, the
//! empty-listing policy, and the deliberately weaker remove-by-id
//! behavior. Failed batches leave no trace because every check runs before
//! the first mutation; renames work on a copied table so their sequential
//! collision semantics survive a mid-batch failure.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use kilim_catalog::{
    Carpet, Dimension, ProductDraft, ProductRecord, ProductRevision, ReconcilePlan, Theme,
    values_are_distinct,
};
use kilim_core::{CatalogError, CatalogResult, CompanyId, DimensionId, ProductId, ThemeId};

use super::{CatalogStore, DimensionRename, EmptyCompanyListing, ThemeRename};

#[derive(Debug, Clone)]
struct StoredProduct {
    id: ProductId,
    company_id: CompanyId,
    design_code: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredDimension {
    id: DimensionId,
    product_id: ProductId,
    size: String,
}

#[derive(Debug, Clone)]
struct StoredTheme {
    id: ThemeId,
    product_id: ProductId,
    color: String,
}

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<i64, StoredProduct>,
    dimensions: BTreeMap<i64, StoredDimension>,
    themes: BTreeMap<i64, StoredTheme>,
    product_seq: i64,
    dimension_seq: i64,
    theme_seq: i64,
}

impl State {
    fn next_product_id(&mut self) -> ProductId {
        self.product_seq += 1;
        ProductId::new(self.product_seq)
    }

    fn next_dimension_id(&mut self) -> DimensionId {
        self.dimension_seq += 1;
        DimensionId::new(self.dimension_seq)
    }

    fn next_theme_id(&mut self) -> ThemeId {
        self.theme_seq += 1;
        ThemeId::new(self.theme_seq)
    }

    // BTreeMap iteration is id-ascending, which is creation order.
    fn live_dimensions(&self, product_id: ProductId) -> Vec<Dimension> {
        self.dimensions
            .values()
            .filter(|d| d.product_id == product_id)
            .map(|d| Dimension { id: d.id, product_id: d.product_id, size: d.size.clone() })
            .collect()
    }

    fn live_themes(&self, product_id: ProductId) -> Vec<Theme> {
        self.themes
            .values()
            .filter(|t| t.product_id == product_id)
            .map(|t| Theme { id: t.id, product_id: t.product_id, color: t.color.clone() })
            .collect()
    }

    fn hydrate(&self, id: ProductId) -> Option<ProductRecord> {
        let product = self.products.get(&id.as_i64())?;
        Some(ProductRecord {
            id,
            company_id: product.company_id,
            design_code: product.design_code.clone(),
            description: product.description.clone(),
            dimensions: self.live_dimensions(id),
            themes: self.live_themes(id),
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
    }

    fn design_code_taken(
        &self,
        company_id: CompanyId,
        design_code: &str,
        excluding: Option<ProductId>,
    ) -> bool {
        self.products.values().any(|p| {
            p.company_id == company_id
                && p.design_code == design_code
                && excluding.map_or(true, |ex| ex != p.id)
        })
    }
}

/// In-memory catalog store.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: RwLock<State>,
    empty_listing: EmptyCompanyListing,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how an empty company listing is reported.
    pub fn with_empty_company_listing(mut self, policy: EmptyCompanyListing) -> Self {
        self.empty_listing = policy;
        self
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| CatalogError::internal("catalog state lock poisoned"))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| CatalogError::internal("catalog state lock poisoned"))
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn create_product(&self, draft: &ProductDraft) -> CatalogResult<ProductRecord> {
        if !values_are_distinct(&draft.sizes) {
            return Err(CatalogError::duplicate_key("size list contains repeated values"));
        }
        if !values_are_distinct(&draft.colors) {
            return Err(CatalogError::duplicate_key("color list contains repeated values"));
        }

        let mut state = self.write()?;
        if state.design_code_taken(draft.company_id, &draft.design_code, None) {
            return Err(CatalogError::duplicate_key(format!(
                "design code \"{}\" already used by company {}",
                draft.design_code, draft.company_id
            )));
        }

        let now = Utc::now();
        let id = state.next_product_id();
        state.products.insert(
            id.as_i64(),
            StoredProduct {
                id,
                company_id: draft.company_id,
                design_code: draft.design_code.clone(),
                description: draft.description.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        for size in &draft.sizes {
            let dimension_id = state.next_dimension_id();
            state.dimensions.insert(
                dimension_id.as_i64(),
                StoredDimension { id: dimension_id, product_id: id, size: size.clone() },
            );
        }
        for color in &draft.colors {
            let theme_id = state.next_theme_id();
            state.themes.insert(
                theme_id.as_i64(),
                StoredTheme { id: theme_id, product_id: id, color: color.clone() },
            );
        }

        state
            .hydrate(id)
            .ok_or_else(|| CatalogError::internal("failed to read back created product"))
    }

    async fn product_by_id(&self, id: ProductId) -> CatalogResult<ProductRecord> {
        let state = self.read()?;
        state.hydrate(id).ok_or(CatalogError::ProductNotFound)
    }

    async fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let mut state = self.write()?;
        if state.products.remove(&id.as_i64()).is_none() {
            return Err(CatalogError::ProductNotFound);
        }
        state.dimensions.retain(|_, d| d.product_id != id);
        state.themes.retain(|_, t| t.product_id != id);
        Ok(())
    }

    async fn products_for_company(
        &self,
        company_id: CompanyId,
    ) -> CatalogResult<Vec<ProductRecord>> {
        let state = self.read()?;
        let records: Vec<ProductRecord> = state
            .products
            .values()
            .filter(|p| p.company_id == company_id)
            .filter_map(|p| state.hydrate(p.id))
            .collect();
        if records.is_empty() {
            return match self.empty_listing {
                EmptyCompanyListing::NotFound => Err(CatalogError::ProductNotFound),
                EmptyCompanyListing::Empty => Ok(Vec::new()),
            };
        }
        Ok(records)
    }

    async fn edit_product(&self, revision: &ProductRevision) -> CatalogResult<ProductRecord> {
        let mut state = self.write()?;
        let product_id = revision.product_id;

        let company_id = match state.products.get(&product_id.as_i64()) {
            Some(product) => product.company_id,
            None => return Err(CatalogError::ProductNotFound),
        };
        if state.design_code_taken(company_id, &revision.design_code, Some(product_id)) {
            return Err(CatalogError::duplicate_key(format!(
                "design code \"{}\" already used by another product of the company",
                revision.design_code
            )));
        }
        if revision.sizes.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }
        if revision.colors.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }

        let existing_dimensions = state.live_dimensions(product_id);
        let dimension_plan = ReconcilePlan::between(
            existing_dimensions.iter().map(|d| (d.id, d.size.as_str())),
            &revision.sizes,
        );
        if let Some(repeat) = first_repeat(&dimension_plan.insert) {
            return Err(CatalogError::duplicate_key(format!(
                "size \"{repeat}\" already present for product {product_id}"
            )));
        }
        let existing_themes = state.live_themes(product_id);
        let theme_plan = ReconcilePlan::between(
            existing_themes.iter().map(|t| (t.id, t.color.as_str())),
            &revision.colors,
        );
        if let Some(repeat) = first_repeat(&theme_plan.insert) {
            return Err(CatalogError::duplicate_key(format!(
                "color \"{repeat}\" already present for product {product_id}"
            )));
        }

        // Every check passed; apply the scalar update and both plans. The
        // scalar update always bumps updated_at, so a value-equal revision
        // still touches the aggregate timestamp.
        let now = Utc::now();
        if let Some(product) = state.products.get_mut(&product_id.as_i64()) {
            product.design_code = revision.design_code.clone();
            product.description = revision.description.clone();
            product.updated_at = now;
        }
        for id in &dimension_plan.delete {
            state.dimensions.remove(&id.as_i64());
        }
        for size in &dimension_plan.insert {
            let id = state.next_dimension_id();
            state
                .dimensions
                .insert(id.as_i64(), StoredDimension { id, product_id, size: size.clone() });
        }
        for id in &theme_plan.delete {
            state.themes.remove(&id.as_i64());
        }
        for color in &theme_plan.insert {
            let id = state.next_theme_id();
            state
                .themes
                .insert(id.as_i64(), StoredTheme { id, product_id, color: color.clone() });
        }

        state.hydrate(product_id).ok_or(CatalogError::ProductNotFound)
    }

    async fn add_dimensions(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<Vec<Dimension>> {
        if sizes.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }
        let mut state = self.write()?;
        if !state.products.contains_key(&product_id.as_i64()) {
            return Err(CatalogError::ProductNotFound);
        }

        let mut occupied: HashSet<String> = state
            .live_dimensions(product_id)
            .into_iter()
            .map(|d| d.size)
            .collect();
        for size in sizes {
            if !occupied.insert(size.clone()) {
                return Err(CatalogError::duplicate_key(format!(
                    "size \"{size}\" already present for product {product_id}"
                )));
            }
        }

        let mut rows = Vec::with_capacity(sizes.len());
        for size in sizes {
            let id = state.next_dimension_id();
            state
                .dimensions
                .insert(id.as_i64(), StoredDimension { id, product_id, size: size.clone() });
            rows.push(Dimension { id, product_id, size: size.clone() });
        }
        Ok(rows)
    }

    async fn remove_dimensions_by_size(
        &self,
        product_id: ProductId,
        sizes: &[String],
    ) -> CatalogResult<()> {
        if sizes.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }
        let mut state = self.write()?;

        // Walk the request against a snapshot so a size with no remaining
        // row aborts before anything is removed.
        let mut remaining: Vec<(DimensionId, String)> = state
            .live_dimensions(product_id)
            .into_iter()
            .map(|d| (d.id, d.size))
            .collect();
        let mut doomed: Vec<DimensionId> = Vec::new();
        for size in sizes {
            let matched: Vec<DimensionId> = remaining
                .iter()
                .filter(|(_, s)| s == size)
                .map(|(id, _)| *id)
                .collect();
            if matched.is_empty() {
                return Err(CatalogError::DimensionNotFound);
            }
            remaining.retain(|(id, _)| !matched.contains(id));
            doomed.extend(matched);
        }
        for id in doomed {
            state.dimensions.remove(&id.as_i64());
        }
        Ok(())
    }

    async fn remove_dimensions_by_id(
        &self,
        product_id: ProductId,
        ids: &[DimensionId],
    ) -> CatalogResult<()> {
        if ids.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }
        let mut state = self.write()?;

        // Deletions stay applied even when the count comes up short.
        let mut affected = 0usize;
        for id in ids {
            let owned = state
                .dimensions
                .get(&id.as_i64())
                .is_some_and(|d| d.product_id == product_id);
            if owned {
                state.dimensions.remove(&id.as_i64());
                affected += 1;
            }
        }
        if affected != ids.len() {
            return Err(CatalogError::DimensionNotFound);
        }
        Ok(())
    }

    async fn rename_dimensions(&self, renames: &[DimensionRename]) -> CatalogResult<()> {
        if renames.is_empty() {
            return Err(CatalogError::InvalidDimension);
        }
        let mut state = self.write()?;

        // Renames are order-dependent: a value vacated earlier in the batch
        // may be taken later. Work on a copy and swap it in on success.
        let mut table = state.dimensions.clone();
        for rename in renames {
            let owned = table
                .get(&rename.id.as_i64())
                .is_some_and(|row| row.product_id == rename.product_id);
            if !owned {
                return Err(CatalogError::DimensionNotFound);
            }
            let collision = table.values().any(|row| {
                row.product_id == rename.product_id
                    && row.size == rename.size
                    && row.id != rename.id
            });
            if collision {
                return Err(CatalogError::duplicate_key(format!(
                    "size \"{}\" already present for product {}",
                    rename.size, rename.product_id
                )));
            }
            if let Some(row) = table.get_mut(&rename.id.as_i64()) {
                row.size = rename.size.clone();
            }
        }
        state.dimensions = table;
        Ok(())
    }

    async fn dimensions_for_product(
        &self,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Dimension>> {
        let state = self.read()?;
        Ok(state.live_dimensions(product_id))
    }

    async fn add_themes(
        &self,
        product_id: ProductId,
        colors: &[String],
    ) -> CatalogResult<Vec<Theme>> {
        if colors.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }
        let mut state = self.write()?;
        if !state.products.contains_key(&product_id.as_i64()) {
            return Err(CatalogError::ProductNotFound);
        }

        let mut occupied: HashSet<String> = state
            .live_themes(product_id)
            .into_iter()
            .map(|t| t.color)
            .collect();
        for color in colors {
            if !occupied.insert(color.clone()) {
                return Err(CatalogError::duplicate_key(format!(
                    "color \"{color}\" already present for product {product_id}"
                )));
            }
        }

        let mut rows = Vec::with_capacity(colors.len());
        for color in colors {
            let id = state.next_theme_id();
            state
                .themes
                .insert(id.as_i64(), StoredTheme { id, product_id, color: color.clone() });
            rows.push(Theme { id, product_id, color: color.clone() });
        }
        Ok(rows)
    }

    async fn remove_themes_by_color(
        &self,
        product_id: ProductId,
        colors: &[String],
    ) -> CatalogResult<()> {
        if colors.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }
        let mut state = self.write()?;

        let mut remaining: Vec<(ThemeId, String)> = state
            .live_themes(product_id)
            .into_iter()
            .map(|t| (t.id, t.color))
            .collect();
        let mut doomed: Vec<ThemeId> = Vec::new();
        for color in colors {
            let matched: Vec<ThemeId> = remaining
                .iter()
                .filter(|(_, c)| c == color)
                .map(|(id, _)| *id)
                .collect();
            if matched.is_empty() {
                return Err(CatalogError::ThemeNotFound);
            }
            remaining.retain(|(id, _)| !matched.contains(id));
            doomed.extend(matched);
        }
        for id in doomed {
            state.themes.remove(&id.as_i64());
        }
        Ok(())
    }

    async fn remove_themes_by_id(
        &self,
        product_id: ProductId,
        ids: &[ThemeId],
    ) -> CatalogResult<()> {
        if ids.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }
        let mut state = self.write()?;

        let mut affected = 0usize;
        for id in ids {
            let owned = state
                .themes
                .get(&id.as_i64())
                .is_some_and(|t| t.product_id == product_id);
            if owned {
                state.themes.remove(&id.as_i64());
                affected += 1;
            }
        }
        if affected != ids.len() {
            return Err(CatalogError::ThemeNotFound);
        }
        Ok(())
    }

    async fn rename_themes(&self, renames: &[ThemeRename]) -> CatalogResult<()> {
        if renames.is_empty() {
            return Err(CatalogError::InvalidTheme);
        }
        let mut state = self.write()?;

        let mut table = state.themes.clone();
        for rename in renames {
            let owned = table
                .get(&rename.id.as_i64())
                .is_some_and(|row| row.product_id == rename.product_id);
            if !owned {
                return Err(CatalogError::ThemeNotFound);
            }
            let collision = table.values().any(|row| {
                row.product_id == rename.product_id
                    && row.color == rename.color
                    && row.id != rename.id
            });
            if collision {
                return Err(CatalogError::duplicate_key(format!(
                    "color \"{}\" already present for product {}",
                    rename.color, rename.product_id
                )));
            }
            if let Some(row) = table.get_mut(&rename.id.as_i64()) {
                row.color = rename.color.clone();
            }
        }
        state.themes = table;
        Ok(())
    }

    async fn themes_for_product(&self, product_id: ProductId) -> CatalogResult<Vec<Theme>> {
        let state = self.read()?;
        Ok(state.live_themes(product_id))
    }

    async fn carpets_for_company(&self, company_id: CompanyId) -> CatalogResult<Vec<Carpet>> {
        let state = self.read()?;
        let mut carpets = Vec::new();
        for product in state.products.values().filter(|p| p.company_id == company_id) {
            if let Some(record) = state.hydrate(product.id) {
                carpets.extend(Carpet::enumerate(&record));
            }
        }
        Ok(carpets)
    }

    async fn carpets_for_product(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
    ) -> CatalogResult<Vec<Carpet>> {
        let state = self.read()?;
        let Some(record) = state.hydrate(product_id) else {
            return Ok(Vec::new());
        };
        if record.company_id != company_id {
            return Ok(Vec::new());
        }
        Ok(Carpet::enumerate(&record))
    }
}

/// First value that repeats within the list.
fn first_repeat(values: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .iter()
        .find(|v| !seen.insert(v.as_str()))
        .map(|v| v.as_str())
}
