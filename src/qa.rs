//! Question answering orchestration.
//!
//! One question flows through: embed → top-K retrieval → context assembly →
//! drafting (with a stitched-snippet fallback) → cache → preview. Every
//! answered question is cached, including the no-results sentinel, so the
//! calling layer can always serve "show more" from the answer id.

use tracing::warn;

use crate::app::AppContext;
use crate::cache::make_answer_id;
use crate::error::QaError;
use crate::models::{AskResponse, RetrievedChunk};

/// Cached and returned verbatim when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str =
    "No relevant information found in the current document set.";

/// Answer one question against the ingested corpus.
pub async fn ask(
    ctx: &AppContext,
    question: &str,
    top_k: Option<i64>,
) -> Result<AskResponse, QaError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(QaError::Validation("missing question".into()));
    }

    let top_k = top_k
        .filter(|k| *k > 0)
        .unwrap_or(ctx.config.retrieval.top_k);

    let query_vector = ctx.embedder.embed_one(question).await?;
    let hits = ctx.store.vector_search(&query_vector, top_k).await?;

    if hits.is_empty() {
        let answer_id = make_answer_id();
        ctx.cache
            .save(
                &answer_id,
                NO_RESULTS_ANSWER,
                ctx.config.cache.empty_ttl_minutes,
            )
            .await?;
        return Ok(AskResponse {
            answer_preview: NO_RESULTS_ANSWER.to_string(),
            answer_id,
            is_truncated: false,
        });
    }

    let context = build_context(&hits, ctx.config.retrieval.context_max_chars);

    let full_answer = match ctx.drafter.draft_answer(question, &context).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "drafting failed, stitching snippets");
            stitch_snippets(&hits)
        }
    };

    let answer_id = make_answer_id();
    ctx.cache
        .save(
            &answer_id,
            &full_answer,
            ctx.config.cache.answer_ttl_minutes,
        )
        .await?;

    let (answer_preview, is_truncated) = to_preview(
        &full_answer,
        ctx.config.preview.max_chars,
        ctx.config.preview.min_word_cut,
    );

    Ok(AskResponse {
        answer_preview,
        answer_id,
        is_truncated,
    })
}

/// Fetch the full cached answer text for an id returned by [`ask`].
pub async fn get_answer(ctx: &AppContext, id: &str) -> Result<String, QaError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(QaError::Validation("missing answer id".into()));
    }

    ctx.cache.load(id).await?.ok_or(QaError::AnswerNotFound)
}

/// Assemble grounding blocks from hits, most relevant first, stopping before
/// the character budget would be exceeded. Lower-relevance hits past the
/// budget are dropped.
pub fn build_context(hits: &[RetrievedChunk], max_chars: usize) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut total = 0;

    for hit in hits {
        let block = if hit.content.is_empty() {
            &hit.snippet
        } else {
            &hit.content
        };
        if block.is_empty() {
            continue;
        }
        if total + block.len() > max_chars {
            break;
        }
        total += block.len();
        blocks.push(block.clone());
    }

    blocks
}

/// Deterministic fallback answer: the top hits' snippets stitched into one
/// paragraph block.
fn stitch_snippets(hits: &[RetrievedChunk]) -> String {
    let parts: Vec<String> = hits
        .iter()
        .take(3)
        .map(|hit| {
            let text = if hit.snippet.trim().is_empty() {
                &hit.content
            } else {
                &hit.snippet
            };
            text.trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect();

    format!("Based on the retrieved passages:\n\n{}", parts.join("\n\n"))
}

/// Bound `text` to `max_chars`, cutting at the last space when one exists
/// past `min_word_cut`, and append an ellipsis. Returns the preview and
/// whether truncation occurred.
pub fn to_preview(text: &str, max_chars: usize, min_word_cut: usize) -> (String, bool) {
    let text = text.trim();
    if text.len() <= max_chars {
        return (text.to_string(), false);
    }

    let mut budget = max_chars;
    while budget > 0 && !text.is_char_boundary(budget) {
        budget -= 1;
    }
    let slice = &text[..budget];

    let cut = match slice.rfind(' ') {
        Some(space) if space > min_word_cut => &slice[..space],
        _ => slice,
    };

    (format!("{}…", cut.trim_end()), true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn hit(content: &str, snippet: &str) -> RetrievedChunk {
        RetrievedChunk {
            document_id: Uuid::new_v4(),
            title: "doc".into(),
            content: content.into(),
            snippet: snippet.into(),
            page_from: None,
            page_to: None,
        }
    }

    #[test]
    fn context_accumulates_until_budget() {
        let hits = vec![
            hit(&"a".repeat(100), ""),
            hit(&"b".repeat(100), ""),
            hit(&"c".repeat(100), ""),
        ];
        let blocks = build_context(&hits, 250);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with('a'));
        assert!(blocks[1].starts_with('b'));
    }

    #[test]
    fn context_skips_empty_hits_and_uses_snippet_fallback() {
        let hits = vec![hit("", ""), hit("", "the snippet"), hit("real content", "s")];
        let blocks = build_context(&hits, 1000);
        assert_eq!(blocks, vec!["the snippet".to_string(), "real content".to_string()]);
    }

    #[test]
    fn context_stops_at_first_over_budget_hit() {
        // ordered by relevance: the oversized second hit ends accumulation
        // even though the third would fit
        let hits = vec![hit("aaaa", ""), hit(&"b".repeat(50), ""), hit("cc", "")];
        let blocks = build_context(&hits, 10);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn stitched_fallback_uses_top_three_snippets() {
        let hits = vec![
            hit("c1", "first snippet"),
            hit("c2", "second snippet"),
            hit("c3", "third snippet"),
            hit("c4", "fourth snippet"),
        ];
        let stitched = stitch_snippets(&hits);
        assert!(stitched.starts_with("Based on the retrieved passages:"));
        assert!(stitched.contains("first snippet"));
        assert!(stitched.contains("third snippet"));
        assert!(!stitched.contains("fourth snippet"));
    }

    #[test]
    fn stitched_fallback_prefers_content_when_snippet_blank() {
        let hits = vec![hit("full content here", " ")];
        assert!(stitch_snippets(&hits).contains("full content here"));
    }

    #[test]
    fn short_text_is_not_truncated() {
        let (preview, truncated) = to_preview("a short answer", 700, 400);
        assert_eq!(preview, "a short answer");
        assert!(!truncated);
    }

    #[test]
    fn long_text_cuts_at_a_word_boundary() {
        let text = "word ".repeat(300);
        let (preview, truncated) = to_preview(&text, 700, 400);
        assert!(truncated);
        assert!(preview.ends_with('…'));
        assert!(preview.chars().count() < text.trim().chars().count());
        // the cut lands between words, not inside one
        let without_marker = preview.trim_end_matches('…');
        assert!(without_marker.ends_with("word"));
    }

    #[test]
    fn unbroken_text_cuts_hard_at_the_budget() {
        let text = "x".repeat(1000);
        let (preview, truncated) = to_preview(&text, 700, 400);
        assert!(truncated);
        assert_eq!(preview.chars().count(), 701); // 700 + ellipsis
    }

    #[test]
    fn word_cut_ignores_spaces_before_the_floor() {
        // only space is at offset 3, well before the 400-char floor
        let text = format!("ab {}", "x".repeat(1000));
        let (preview, truncated) = to_preview(&text, 700, 400);
        assert!(truncated);
        assert_eq!(preview.chars().count(), 701);
    }

    #[test]
    fn exact_budget_text_is_untouched() {
        let text = "y".repeat(700);
        let (preview, truncated) = to_preview(&text, 700, 400);
        assert_eq!(preview, text);
        assert!(!truncated);
    }
}
