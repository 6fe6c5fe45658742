//! Ingestion orchestration.
//!
//! Drives extract → chunk → embed → persist for each entry in a batch.
//! Per-entry persistence is atomic (the store inserts a document's chunk
//! batch in one transaction); what happens to the rest of the batch when one
//! entry fails is a policy choice (`[ingest] on_entry_error`).

use tracing::{info, warn};

use crate::app::AppContext;
use crate::chunk::chunk_text;
use crate::config::EntryErrorPolicy;
use crate::error::QaError;
use crate::extract;
use crate::models::{EntrySummary, IngestEntry, NewChunk};

/// Snippets are the first this-many chars of chunk content.
const SNIPPET_MAX_CHARS: usize = 240;

/// Ingest a batch of uploaded files. Only entries with a recognized document
/// extension are processed; the returned summaries are index-aligned with the
/// eligible entries that succeeded.
pub async fn ingest_batch(
    ctx: &AppContext,
    entries: &[IngestEntry],
) -> Result<Vec<EntrySummary>, QaError> {
    if entries.is_empty() {
        return Err(QaError::Validation("ingestion payload is empty".into()));
    }

    let mut summaries = Vec::new();

    for entry in entries.iter().filter(|e| is_eligible(&e.name)) {
        match ingest_entry(ctx, entry).await {
            Ok(summary) => {
                info!(
                    title = %summary.title,
                    chunks = summary.chunks,
                    pages = summary.pages,
                    "ingested document"
                );
                summaries.push(summary);
            }
            Err(e) => match ctx.config.ingest.on_entry_error {
                EntryErrorPolicy::Skip => {
                    warn!(entry = %entry.name, error = %e, "skipping entry after ingest failure");
                }
                EntryErrorPolicy::Abort => return Err(e),
            },
        }
    }

    Ok(summaries)
}

async fn ingest_entry(ctx: &AppContext, entry: &IngestEntry) -> Result<EntrySummary, QaError> {
    let extracted = extract::extract_pdf(&entry.bytes)?;

    let passages = chunk_text(
        &extracted.text,
        ctx.config.chunking.max_tokens,
        ctx.config.chunking.overlap_tokens,
    );

    let vectors = ctx
        .embedder
        .embed_many(&passages, ctx.config.embedding.concurrency)
        .await?;

    let rows: Vec<NewChunk> = passages
        .into_iter()
        .zip(vectors)
        .map(|(content, embedding)| NewChunk {
            snippet: snippet_of(&content),
            content,
            page_from: None,
            page_to: None,
            embedding,
        })
        .collect();

    let document_id = ctx.store.insert_document(&entry.name, extracted.pages).await?;
    ctx.store.insert_chunks(document_id, &rows).await?;

    Ok(EntrySummary {
        title: entry.name.clone(),
        pages: extracted.pages,
        chunks: rows.len(),
    })
}

fn is_eligible(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

fn snippet_of(content: &str) -> String {
    content.chars().take(SNIPPET_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pdf_entries_are_eligible() {
        assert!(is_eligible("report.pdf"));
        assert!(is_eligible("REPORT.PDF"));
        assert!(!is_eligible("notes.txt"));
        assert!(!is_eligible("archive.zip"));
        assert!(!is_eligible("pdf"));
    }

    #[test]
    fn snippet_is_a_bounded_prefix() {
        let content = "x".repeat(1000);
        let snippet = snippet_of(&content);
        assert_eq!(snippet.len(), SNIPPET_MAX_CHARS);
        assert!(content.starts_with(&snippet));

        assert_eq!(snippet_of("short"), "short");
    }

    #[test]
    fn snippet_respects_multibyte_chars() {
        let content = "é".repeat(300);
        let snippet = snippet_of(&content);
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS);
    }
}
