//! Browse state for a session, kept apart from the read-only catalog.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::filter::ListingFilter;
use crate::model::ContentRecord;
use crate::paging::{self, Page};
use crate::search::text_search;
use crate::sort::{sort_records, SortMode};

/// What the user has selected. The engine itself is stateless given these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseState {
    pub filter: ListingFilter,
    pub sort: SortMode,
    /// 1-based.
    pub page: usize,
    pub query: String,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self { filter: ListingFilter::default(), sort: SortMode::default(), page: 1, query: String::new() }
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    catalog: Arc<Catalog>,
    page_size: usize,
    interleave: bool,
    pub state: BrowseState,
}

impl AppContext {
    pub fn new(catalog: Arc<Catalog>, page_size: usize, interleave: bool) -> Self {
        Self { catalog, page_size: page_size.max(1), interleave, state: BrowseState::default() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Changing what is listed starts again at page 1.
    pub fn set_filter(&mut self, filter: ListingFilter) {
        self.state.filter = filter;
        self.state.page = 1;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.query = query.into();
        self.state.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.state.sort = sort;
        self.state.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.page = page;
    }

    pub fn next_page(&mut self) {
        self.state.page += 1;
    }

    pub fn prev_page(&mut self) {
        self.state.page = self.state.page.saturating_sub(1).max(1);
    }

    /// Every record matching query and filter, in the selected order.
    pub fn results(&self) -> Vec<&ContentRecord> {
        let matched = text_search(self.catalog.records(), &self.state.query, &self.state.filter);
        sort_records(matched, self.state.sort, self.interleave)
    }

    /// Serves the current page, writing back the page actually served so an
    /// out-of-range request is remembered as page 1.
    pub fn current_page(&mut self) -> Page<&ContentRecord> {
        let state = &mut self.state;
        let matched = text_search(self.catalog.records(), &state.query, &state.filter);
        let sorted = sort_records(matched, state.sort, self.interleave);
        let page = paging::paginate(&sorted, state.page, self.page_size);
        state.page = page.page;
        page
    }
}
