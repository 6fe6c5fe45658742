//! Vector store adapter over Postgres + pgvector.
//!
//! Documents and their chunks are persisted here; retrieval orders stored
//! chunks by L2 distance (`<->`) to a query embedding. Embeddings cross the
//! wire in pgvector's canonical literal form, produced by [`vector_literal`].
//!
//! Chunk batches are all-or-nothing: every row of a document's batch is
//! inserted inside one transaction, so a failure on any row rolls the whole
//! batch back and a document can never be visible with a partial chunk set.

use std::fmt::Write as _;

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::QaError;
use crate::models::{NewChunk, RetrievedChunk};

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    dims: usize,
}

impl Store {
    pub fn new(pool: PgPool, dims: usize) -> Self {
        Self { pool, dims }
    }

    /// Insert one document record and return its generated id.
    pub async fn insert_document(
        &self,
        title: &str,
        pages: Option<i32>,
    ) -> Result<Uuid, QaError> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO documents (id, title, pages, created_at) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(title)
            .bind(pages)
            .bind(chrono::Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    /// Insert all chunk rows for `document_id` in one transaction.
    pub async fn insert_chunks(
        &self,
        document_id: Uuid,
        rows: &[NewChunk],
    ) -> Result<(), QaError> {
        for row in rows {
            if row.embedding.len() != self.dims {
                return Err(QaError::DimensionMismatch {
                    got: row.embedding.len(),
                    want: self.dims,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, content, snippet, page_from, page_to, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7::vector)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(&row.content)
            .bind(&row.snippet)
            .bind(row.page_from)
            .bind(row.page_to)
            .bind(vector_literal(&row.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The `top_k` stored chunks closest to `query`, ascending by L2 distance.
    pub async fn vector_search(
        &self,
        query: &[f32],
        top_k: i64,
    ) -> Result<Vec<RetrievedChunk>, QaError> {
        if query.len() != self.dims {
            return Err(QaError::DimensionMismatch {
                got: query.len(),
                want: self.dims,
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT d.id AS document_id,
                   d.title,
                   c.content,
                   c.snippet,
                   c.page_from,
                   c.page_to
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            ORDER BY c.embedding <-> $1::vector
            LIMIT $2
            "#,
        )
        .bind(vector_literal(query))
        .bind(top_k)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RetrievedChunk {
                document_id: row.get("document_id"),
                title: row.get("title"),
                content: row.get("content"),
                snippet: row.get("snippet"),
                page_from: row.get("page_from"),
                page_to: row.get("page_to"),
            })
            .collect())
    }
}

/// Format an embedding as a pgvector input literal: `[v1,v2,...,vn]`,
/// comma-joined with no internal whitespace. The store's vector parser
/// expects exactly this form.
pub fn vector_literal(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 8 + 2);
    out.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_bracketed_and_comma_joined() {
        assert_eq!(vector_literal(&[0.1, -0.2, 1.0]), "[0.1,-0.2,1]");
    }

    #[test]
    fn literal_has_no_whitespace() {
        let lit = vector_literal(&[1.5, 2.25, -3.0, 0.0]);
        assert!(!lit.contains(' '));
        assert_eq!(lit, "[1.5,2.25,-3,0]");
    }

    #[test]
    fn empty_vector_literal() {
        assert_eq!(vector_literal(&[]), "[]");
    }
}
