//! TTL-based answer cache.
//!
//! Full answer texts are stored under caller-generated opaque ids so the
//! calling layer can return a bounded preview first and serve the complete
//! text on demand. Expiry is lazy: `load` filters on `expires_at > now()`
//! and expired rows simply stop being visible; no background sweep.
//!
//! The cache never generates ids; callers mint them with [`make_answer_id`].

use rand::Rng;
use sqlx::PgPool;

use crate::error::QaError;

#[derive(Clone)]
pub struct AnswerCache {
    pool: PgPool,
}

impl AnswerCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert: the same id overwrites prior text and resets the expiry to
    /// `now + ttl`. Expiry is computed store-side so save and load share
    /// one clock.
    pub async fn save(
        &self,
        id: &str,
        full_text: &str,
        ttl_minutes: i32,
    ) -> Result<(), QaError> {
        sqlx::query(
            r#"
            INSERT INTO answers (id, full_answer, expires_at)
            VALUES ($1, $2, now() + make_interval(mins => $3))
            ON CONFLICT (id) DO UPDATE
            SET full_answer = EXCLUDED.full_answer,
                expires_at  = EXCLUDED.expires_at
            "#,
        )
        .bind(id)
        .bind(full_text)
        .bind(ttl_minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The stored text, or `None` once the expiry has passed.
    pub async fn load(&self, id: &str) -> Result<Option<String>, QaError> {
        let text: Option<String> = sqlx::query_scalar(
            "SELECT full_answer FROM answers WHERE id = $1 AND expires_at > now()",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(text)
    }
}

/// A short, URL-safe, unguessable answer id: 12 cryptographically random
/// bytes, hex-encoded (24 chars).
pub fn make_answer_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_ids_are_24_hex_chars() {
        let id = make_answer_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn answer_ids_do_not_repeat() {
        let a = make_answer_id();
        let b = make_answer_id();
        assert_ne!(a, b);
    }
}
