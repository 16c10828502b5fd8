use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::message::{Conversation, Message};

#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Conversations are unordered pairs; participants are stored sorted so
    /// the unique index catches both orientations.
    pub async fn get_or_create_conversation(
        &self,
        school_id: Uuid,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Conversation> {
        if user_a == user_b {
            return Err(Error::BadRequest(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }
        let (lo, hi) = if user_a < user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (school_id, participant_a, participant_b)
            VALUES ($1, $2, $3)
            ON CONFLICT (participant_a, participant_b) DO UPDATE SET school_id = conversations.school_id
            RETURNING *
            "#,
        )
        .bind(school_id)
        .bind(lo)
        .bind(hi)
        .fetch_one(&self.pool)
        .await?;
        Ok(conversation)
    }

    pub async fn get_conversation_for_user(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE id = $1 AND (participant_a = $2 OR participant_b = $2)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Conversation not found".to_string()))?;
        Ok(conversation)
    }

    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"UPDATE conversations SET last_message_at = NOW() WHERE id = $1"#,
        )
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE participant_a = $1 OR participant_b = $1
            ORDER BY last_message_at DESC NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }

    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = NOW()
            WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages m
            JOIN conversations c ON m.conversation_id = c.id
            WHERE (c.participant_a = $1 OR c.participant_b = $1)
              AND m.sender_id <> $1
              AND m.read_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
