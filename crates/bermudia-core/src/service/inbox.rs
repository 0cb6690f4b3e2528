//! The persisted inbox.
//!
//! Hub notifications only reach connected players. Events a player must
//! see after reconnecting are also written to the inbox, once the action
//! that produced them has committed.

use chrono::{DateTime, Utc};

use bermudia_db::GameStore;
use bermudia_types::{InboxContent, InboxMessage, InboxMessageId, UserId, store_timestamp};

use super::GameService;
use crate::error::ActionError;

/// Page size when the caller does not ask for one.
pub const DEFAULT_INBOX_PAGE: u32 = 20;

/// Largest page a caller may ask for.
pub const MAX_INBOX_PAGE: u32 = 100;

impl<S: GameStore> GameService<S> {
    /// A page of `user`'s messages, newest first.
    ///
    /// `before` continues from the `created_at` of the last message of the
    /// previous page.
    pub async fn inbox(
        &self,
        user: UserId,
        before: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<InboxMessage>, ActionError> {
        self.player(user).await?;
        let limit = limit.unwrap_or(DEFAULT_INBOX_PAGE).clamp(1, MAX_INBOX_PAGE);
        self.call(self.store.messages(user, before, limit)).await
    }

    /// Persist `content` for `user`.
    ///
    /// Runs after the producing action committed, so a failure is logged
    /// and does not undo the action.
    pub(super) async fn deliver(&self, user: UserId, content: InboxContent) {
        let message = InboxMessage {
            id: InboxMessageId::new(),
            user_id: user,
            content,
            created_at: store_timestamp(),
        };
        let id = message.id;
        if let Err(err) = self.call(self.store.create_message(message)).await {
            tracing::warn!(user_id = %user, message_id = %id, error = %err, "Inbox delivery failed");
        }
    }
}
