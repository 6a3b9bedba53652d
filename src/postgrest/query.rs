//! Query builder for PostgrestClient

use crate::postgrest::filter::{Filter, FilterOperator};
use crate::postgrest::types::SortOrder;

/// Accumulated query parameters of one request
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: Option<String>,
    filters: Vec<Filter>,
    order: Option<(String, SortOrder)>,
    limit: Option<usize>,
    on_conflict: Option<String>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_select(&mut self, columns: &str) {
        self.select = Some(columns.to_string());
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn set_order(&mut self, column: &str, order: SortOrder) {
        self.order = Some((column.to_string(), order));
    }

    pub fn set_limit(&mut self, count: usize) {
        self.limit = Some(count);
    }

    pub fn set_on_conflict(&mut self, columns: &str) {
        self.on_conflict = Some(columns.to_string());
    }

    /// Whether any row filter was added
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Render the query parameters in a stable order
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(select) = &self.select {
            params.push(("select".to_string(), select.clone()));
        }

        params.extend(self.filters.iter().map(Filter::to_param));

        if let Some((column, order)) = &self.order {
            params.push(("order".to_string(), format!("{}.{}", column, order.as_str())));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        if let Some(columns) = &self.on_conflict {
            params.push(("on_conflict".to_string(), columns.clone()));
        }

        params
    }
}

/// `column=is.null`
pub(crate) fn is_null(column: &str) -> Filter {
    Filter::new(column, FilterOperator::Is, "null")
}
