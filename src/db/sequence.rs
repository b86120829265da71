// src/db/sequence.rs

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::error::AppError;

/// Contador monotônico por prefixo (um por dia para as licenças).
/// Chamadas concorrentes nunca recebem o mesmo valor.
#[async_trait]
pub trait PermitSequence: Send + Sync {
    async fn next_value(&self, prefix: &str) -> Result<i32, AppError>;
}

// Upsert atômico: a linha do prefixo serializa os escritores
#[derive(Clone)]
pub struct PgPermitSequence {
    pool: PgPool,
}

impl PgPermitSequence {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermitSequence for PgPermitSequence {
    async fn next_value(&self, prefix: &str) -> Result<i32, AppError> {
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO permit_sequences (prefix, last_value)
            VALUES ($1, 1)
            ON CONFLICT (prefix) DO UPDATE SET last_value = permit_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}

/// Versão em memória (testes e execução sem banco).
#[derive(Default)]
pub struct MemoryPermitSequence {
    counters: Mutex<HashMap<String, i32>>,
}

#[async_trait]
impl PermitSequence for MemoryPermitSequence {
    async fn next_value(&self, prefix: &str) -> Result<i32, AppError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("permit sequence lock poisoned")))?;
        let value = counters.entry(prefix.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn each_prefix_counts_independently() {
        let seq = MemoryPermitSequence::default();
        assert_eq!(seq.next_value("PTW-20260514").await.unwrap(), 1);
        assert_eq!(seq.next_value("PTW-20260514").await.unwrap(), 2);
        assert_eq!(seq.next_value("PTW-20260515").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_get_distinct_values() {
        let seq = Arc::new(MemoryPermitSequence::default());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let seq = seq.clone();
            handles.push(tokio::spawn(async move { seq.next_value("PTW-20260514").await.unwrap() }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort();
        assert_eq!(values, (1..=50).collect::<Vec<_>>());
    }
}
