use shamba_types::api::{ProductQuery, StoreQuery};
use shamba_types::models::ProductCategory;

/// Listing filters as the user edits them (`draft`) and as last applied.
///
/// Editing the draft never triggers a read. `apply` publishes it and goes
/// back to page 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState<F> {
    pub draft: F,
    applied: F,
    page: u32,
    total_pages: u32,
}

impl<F: Clone + Default + PartialEq> FilterState<F> {
    pub fn new() -> Self {
        Self {
            draft: F::default(),
            applied: F::default(),
            page: 1,
            total_pages: 0,
        }
    }

    /// Start from filters carried in by a link, e.g. a category shortcut.
    pub fn with_applied(filters: F) -> Self {
        Self {
            draft: filters.clone(),
            applied: filters,
            page: 1,
            total_pages: 0,
        }
    }

    pub fn applied(&self) -> &F {
        &self.applied
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.applied
    }

    pub fn is_filtered(&self) -> bool {
        self.applied != F::default()
    }

    pub fn apply(&mut self) {
        self.applied = self.draft.clone();
        self.page = 1;
    }

    pub fn clear(&mut self) {
        self.draft = F::default();
        self.applied = F::default();
        self.page = 1;
    }

    /// Record the page count of the latest result.
    pub fn set_total_pages(&mut self, total_pages: u32) {
        self.total_pages = total_pages;
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        true
    }
}

impl<F: Clone + Default + PartialEq> Default for FilterState<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Product listing filters as edited in the sidebar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilters {
    pub search: String,
    pub category: Option<ProductCategory>,
    pub county_id: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreFilters {
    pub search: String,
    pub county_id: Option<i64>,
}

fn search(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl FilterState<ProductFilters> {
    pub fn query(&self) -> ProductQuery {
        let f = &self.applied;
        ProductQuery {
            search: search(&f.search),
            category: f.category,
            county_id: f.county_id,
            // a zero minimum means "no minimum"
            min_price: f.min_price.filter(|p| *p > 0.0),
            max_price: f.max_price,
            page: Some(self.page),
        }
    }
}

impl FilterState<StoreFilters> {
    pub fn query(&self) -> StoreQuery {
        StoreQuery {
            search: search(&self.applied.search),
            county_id: self.applied.county_id,
            page: Some(self.page),
        }
    }
}
