use sqlx::PgPool;

use crate::error::QaError;

/// Create the schema. Idempotent, safe to run on every startup.
///
/// `dims` sizes the vector column; a changed embedding model (different
/// dimension) requires a fresh schema and re-ingestion, chunks are never
/// re-embedded in place.
pub async fn run_migrations(pool: &PgPool, dims: usize) -> Result<(), QaError> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            pages INTEGER,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id UUID PRIMARY KEY,
            document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            snippet TEXT NOT NULL,
            page_from INTEGER,
            page_to INTEGER,
            embedding vector({dims}) NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            id TEXT PRIMARY KEY,
            full_answer TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(pool)
        .await?;

    // Approximate nearest-neighbor index over the embedding column.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_chunks_embedding
        ON chunks USING ivfflat (embedding vector_l2_ops) WITH (lists = 100)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
