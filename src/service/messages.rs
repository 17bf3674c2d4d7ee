//! Message service
//!
//! Direct messages between registered users.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{Database, Identity, Message};
use crate::error::AppError;
use crate::metrics::MESSAGES_SENT_TOTAL;

/// Which side of a message the caller is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// A message as seen by one participant
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub direction: Direction,
}

impl MessageView {
    fn for_viewer(message: Message, viewer_id: &str) -> Self {
        let direction = if message.sender_id == viewer_id {
            Direction::Sent
        } else {
            Direction::Received
        };
        Self {
            id: message.id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            body: message.body,
            created_at: message.created_at,
            is_read: message.is_read,
            direction,
        }
    }
}

/// Message service
pub struct MessageService {
    db: Arc<Database>,
    max_body_len: usize,
}

impl MessageService {
    pub fn new(db: Arc<Database>, max_body_len: usize) -> Self {
        Self { db, max_body_len }
    }

    /// Send a message from `sender` to the user with id `recipient_id`
    pub async fn send(
        &self,
        sender: &Identity,
        recipient_id: &str,
        body: &str,
    ) -> Result<MessageView, AppError> {
        let recipient_id = recipient_id.trim();
        if recipient_id == sender.id {
            return Err(AppError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }
        if body.trim().is_empty() {
            return Err(AppError::Validation("message body is required".to_string()));
        }
        if body.chars().count() > self.max_body_len {
            return Err(AppError::Validation(format!(
                "message body must be at most {} characters",
                self.max_body_len
            )));
        }

        let recipient = self
            .db
            .resolve_by_id(recipient_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recipient {recipient_id} not found")))?;

        let message = self
            .db
            .insert_message(&sender.id, &recipient.id, body, Utc::now())
            .await?;

        MESSAGES_SENT_TOTAL.inc();
        tracing::debug!(message_id = message.id, sender = %sender.id, recipient = %recipient.id, "Message sent");

        Ok(MessageView::for_viewer(message, &sender.id))
    }

    /// Everything `user` sent or received, newest first
    pub async fn list(&self, user: &Identity) -> Result<Vec<MessageView>, AppError> {
        Ok(self
            .db
            .get_messages_for_user(&user.id)
            .await?
            .into_iter()
            .map(|message| MessageView::for_viewer(message, &user.id))
            .collect())
    }

    /// Messages between `user` and `other_id`, oldest first
    pub async fn conversation(
        &self,
        user: &Identity,
        other_id: &str,
    ) -> Result<Vec<MessageView>, AppError> {
        if self.db.resolve_by_id(other_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {other_id} not found")));
        }

        Ok(self
            .db
            .get_conversation(&user.id, other_id)
            .await?
            .into_iter()
            .map(|message| MessageView::for_viewer(message, &user.id))
            .collect())
    }

    async fn owned_message(&self, message_id: i64) -> Result<Message, AppError> {
        self.db
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {message_id} not found")))
    }

    /// Mark a message read; only its recipient may
    pub async fn mark_read(&self, user: &Identity, message_id: i64) -> Result<(), AppError> {
        let message = self.owned_message(message_id).await?;
        if message.recipient_id != user.id {
            return Err(AppError::Forbidden(
                "only the recipient can mark a message as read".to_string(),
            ));
        }

        if !self.db.mark_message_read(message_id).await? {
            return Err(AppError::NotFound(format!("message {message_id} not found")));
        }
        Ok(())
    }

    /// Delete a message; only its sender may
    pub async fn delete(&self, user: &Identity, message_id: i64) -> Result<(), AppError> {
        let message = self.owned_message(message_id).await?;
        if message.sender_id != user.id {
            return Err(AppError::Forbidden(
                "only the sender can delete a message".to_string(),
            ));
        }

        if !self.db.delete_message(message_id).await? {
            return Err(AppError::NotFound(format!("message {message_id} not found")));
        }
        tracing::debug!(message_id, user = %user.id, "Message deleted");
        Ok(())
    }
}
