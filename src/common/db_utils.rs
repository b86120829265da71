// src/common/db_utils.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::error::AppError;

// ---
// Paginação simples (page começa em 1)
// ---
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
        }
    }
}

// Filtro de busca livre usado nas listagens
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<i64>,
}

impl SearchParams {
    /// Termo normalizado para `ILIKE` (None quando vazio).
    pub fn pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q))
    }
}

// ---
// Tradução de violações de integridade do Postgres
// ---

/// FK com `ON DELETE RESTRICT` (ex: Local referenciado por observações).
pub(crate) fn map_restrict_violation(e: sqlx::Error, resource: &str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::ResourceInUse(resource.to_string());
        }
    }
    e.into()
}

/// Chave única violada: devolve o erro de domínio informado.
pub(crate) fn map_unique_violation(e: sqlx::Error, on_conflict: AppError) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_conflict;
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_never_goes_below_first_page() {
        let req = PageRequest::new(Some(0), 10);
        assert_eq!(req.page, 1);
        assert_eq!(req.offset(), 0);

        let req = PageRequest::new(Some(3), 15);
        assert_eq!(req.offset(), 30);
    }

    #[test]
    fn blank_search_is_ignored() {
        let params = SearchParams { q: Some("   ".into()), page: None };
        assert!(params.pattern().is_none());

        let params = SearchParams { q: Some(" crane ".into()), page: None };
        assert_eq!(params.pattern().as_deref(), Some("%crane%"));
    }
}
