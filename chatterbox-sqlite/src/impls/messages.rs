use eyre::{Result, WrapErr};

use crate::{
    model::{Message, MessageUpdate},
    Database,
};

impl Database {
    /// All messages, oldest first; ties on `created_at` keep insertion order.
    pub async fn select_messages(&self) -> Result<Vec<Message>> {
        let query = sqlx::query_as::<_, Message>(
            "SELECT id, body, username, created_at, updated_at \
            FROM messages ORDER BY created_at ASC, id ASC",
        );

        query.fetch_all(self).await.wrap_err("failed to fetch messages")
    }

    pub async fn insert_message(&self, body: &str, username: &str) -> Result<Message> {
        let now = self.now();

        let query = sqlx::query(
            "INSERT INTO messages (body, username, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(body)
        .bind(username)
        .bind(now)
        .bind(now);

        let result = query
            .execute(self)
            .await
            .wrap_err("failed to insert message")?;

        let id = result.last_insert_rowid();
        debug!(id, "Inserted message");

        Ok(Message {
            id,
            body: body.to_owned(),
            username: username.to_owned(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn select_message_by_id(&self, id: i64) -> Result<Option<Message>> {
        let query = sqlx::query_as::<_, Message>(
            "SELECT id, body, username, created_at, updated_at FROM messages WHERE id = ?",
        )
        .bind(id);

        query
            .fetch_optional(self)
            .await
            .wrap_err("failed to fetch optional message")
    }

    /// Applies a body update inside a single transaction.
    ///
    /// `None` means no message has the given id. An absent `new_body` leaves
    /// the row untouched, `updated_at` included, and echoes the stored body.
    pub async fn update_message_body(
        &self,
        id: i64,
        new_body: Option<&str>,
    ) -> Result<Option<MessageUpdate>> {
        let mut tx = self.begin().await.wrap_err("failed to begin transaction")?;

        let query =
            sqlx::query_as::<_, (String,)>("SELECT body FROM messages WHERE id = ?").bind(id);

        let Some((body,)) = query
            .fetch_optional(&mut *tx)
            .await
            .wrap_err("failed to fetch optional body")?
        else {
            return Ok(None);
        };

        let body = match new_body {
            Some(new_body) => {
                let query =
                    sqlx::query("UPDATE messages SET body = ?, updated_at = ? WHERE id = ?")
                        .bind(new_body)
                        .bind(self.now())
                        .bind(id);

                query
                    .execute(&mut *tx)
                    .await
                    .wrap_err("failed to update message body")?;

                new_body.to_owned()
            }
            None => body,
        };

        tx.commit().await.wrap_err("failed to commit transaction")?;

        Ok(Some(MessageUpdate { id, body }))
    }

    /// Removes the row; `false` means there was nothing to remove.
    pub async fn delete_message_by_id(&self, id: i64) -> Result<bool> {
        let query = sqlx::query("DELETE FROM messages WHERE id = ?").bind(id);

        let result = query
            .execute(self)
            .await
            .wrap_err("failed to delete message")?;

        Ok(result.rows_affected() > 0)
    }
}
