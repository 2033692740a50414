//! Direct message operations.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::DirectMessage;
use crate::twitter::types::{DmEvent, parse_timestamp};
use crate::twitter::{Shared, users::TwitterUsers};

/// DM event type carrying message text.
const MESSAGE_CREATE: &str = "MessageCreate";

/// Facade for direct message operations.
///
/// Participants are resolved to full profiles through the shared user cache,
/// so a long thread with one correspondent costs a single profile fetch.
pub struct TwitterDms {
    shared: Arc<Shared>,
    users: TwitterUsers,
}

impl TwitterDms {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            users: TwitterUsers::new(shared.clone()),
            shared,
        }
    }

    /// Get a direct message by event ID.
    pub async fn get(&self, dm_id: &str) -> Result<DirectMessage> {
        let response = self.shared.client.get_dm_event(dm_id).await?;
        let event = response
            .data
            .ok_or_else(|| Error::InvalidResponse("DM lookup returned no data".into()))?;

        self.map_event(event).await
    }

    /// List the authenticated user's direct messages, newest first.
    /// Paginates to completion; non-message events (participant changes)
    /// are skipped.
    pub async fn list_threads(&self) -> Result<Vec<DirectMessage>> {
        let page_size = self.shared.config.page_size;
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .shared
                .client
                .dm_events_page(page_size, token.as_deref())
                .await?;

            for event in page.data.unwrap_or_default() {
                if event.event_type.as_deref() == Some(MESSAGE_CREATE) {
                    items.push(self.map_event(event).await?);
                }
            }

            token = page.meta.and_then(|m| m.next_token);
            if token.is_none() {
                break;
            }
        }

        Ok(items)
    }

    async fn map_event(&self, event: DmEvent) -> Result<DirectMessage> {
        let sender_id = event
            .sender_id
            .ok_or_else(|| Error::InvalidResponse(format!("DM event {} has no sender", event.id)))?;

        let created_at = parse_timestamp(event.created_at.as_deref()).ok_or_else(|| {
            Error::InvalidResponse(format!("DM event {} has no timestamp", event.id))
        })?;

        let sender = self.users.get_user_by_id(&sender_id).await?;

        // Group conversations carry an explicit participant list; one-to-one
        // conversations encode both participants in the conversation ID.
        let recipient_ids: Vec<String> = match (&event.participant_ids, &event.dm_conversation_id) {
            (Some(ids), _) => ids.iter().filter(|id| **id != sender_id).cloned().collect(),
            (None, Some(conversation)) => conversation
                .split('-')
                .filter(|id| !id.is_empty() && *id != sender_id)
                .map(str::to_string)
                .collect(),
            (None, None) => Vec::new(),
        };

        let mut recipients = Vec::with_capacity(recipient_ids.len());
        for id in recipient_ids {
            recipients.push(self.users.get_user_by_id(&id).await?);
        }

        Ok(DirectMessage {
            id: event.id,
            sender,
            recipients,
            text: event.text.unwrap_or_default(),
            created_at,
            // The v2 API does not expose read state.
            read: None,
        })
    }
}
