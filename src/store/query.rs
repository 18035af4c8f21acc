//! PostgREST filter builder
//!
//! Every store query starts from [`Query::for_company`], which pins the
//! `company_id` filter. The service-role key skips RLS, so this filter is the
//! only thing keeping tenants apart on the server side.

use std::fmt::Display;

use serde::Deserialize;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string parameters for a PostgREST request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// Unscoped query, for tables that are not tenant owned
    pub fn new() -> Self {
        Self::default()
    }

    /// Query scoped to a single company
    pub fn for_company(company_id: Uuid) -> Self {
        Self::new().eq("company_id", company_id)
    }

    fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    fn filter(self, column: &str, op: &str, value: impl Display) -> Self {
        self.push(column, format!("{}.{}", op, value))
    }

    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns)
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gt", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is", "null")
    }

    /// Case-insensitive substring match across several columns.
    /// Blank (after sanitising) terms add no filter.
    pub fn search(self, columns: &[&str], term: &str) -> Self {
        let term = sanitize_search_term(term);
        if term.is_empty() || columns.is_empty() {
            return self;
        }

        let clauses = columns
            .iter()
            .map(|c| format!("{}.ilike.*{}*", c, term))
            .collect::<Vec<_>>()
            .join(",");
        self.push("or", format!("({})", clauses))
    }

    /// Chained calls extend one `order` parameter (`a.asc,b.desc`)
    pub fn order(mut self, column: &str, descending: bool) -> Self {
        let direction = if descending { "desc" } else { "asc" };
        let clause = format!("{}.{}", column, direction);
        if let Some((_, existing)) = self.params.iter_mut().find(|(k, _)| k == "order") {
            existing.push(',');
            existing.push_str(&clause);
            return self;
        }
        self.push("order", clause)
    }

    pub fn limit(self, limit: u32) -> Self {
        self.push("limit", limit.to_string())
    }

    pub fn offset(self, offset: u64) -> Self {
        self.push("offset", offset.to_string())
    }

    pub fn paginate(self, page: Pagination) -> Self {
        self.limit(page.limit).offset(page.offset())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Strip characters that carry meaning inside a PostgREST `or=(...)` filter
pub fn sanitize_search_term(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '@'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Normalised pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Clamp user input: page starts at 1, limit is 1..=MAX_PAGE_SIZE
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        Self::new(params.page, params.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Query {
        fn get(&self, key: &str) -> Option<&str> {
            self.params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    #[test]
    fn company_scope_comes_first() {
        let company = Uuid::new_v4();
        let query = Query::for_company(company).eq("sku", "ABC-1");
        assert_eq!(query.pairs()[0], ("company_id".to_string(), format!("eq.{}", company)));
        assert_eq!(query.get("sku"), Some("eq.ABC-1"));
    }

    #[test]
    fn search_builds_or_filter() {
        let query = Query::new().search(&["title", "sku"], "Blue Shirt");
        assert_eq!(query.get("or"), Some("(title.ilike.*Blue Shirt*,sku.ilike.*Blue Shirt*)"));
    }

    #[test]
    fn search_strips_filter_syntax() {
        assert_eq!(sanitize_search_term("a),company_id.neq.(x"), "acompany_id.neq.x");
        assert_eq!(sanitize_search_term("  jane@shop.com "), "jane@shop.com");

        let query = Query::new().search(&["title"], "(*),");
        assert!(query.get("or").is_none());
    }

    #[test]
    fn orderings_share_one_parameter() {
        let query = Query::new().order("product_title", false).order("sku", true);
        assert_eq!(query.get("order"), Some("product_title.asc,sku.desc"));
        assert_eq!(query.pairs().len(), 1);
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, limit: 25 });
        assert_eq!(Pagination::new(Some(0), Some(1000)), Pagination { page: 1, limit: 100 });
        assert_eq!(Pagination::new(Some(3), Some(0)).limit, 1);
        assert_eq!(Pagination::new(Some(3), Some(20)).offset(), 40);

        let query = Query::new().paginate(Pagination::new(Some(2), Some(10)));
        assert_eq!(query.get("limit"), Some("10"));
        assert_eq!(query.get("offset"), Some("10"));
    }
}
