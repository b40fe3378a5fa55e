use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::conversation::turn::Turn;
use crate::error::{CoreError, CoreResult};

/// In-memory conversation history, keyed by conversation id.
///
/// The store keeps every turn it is given; callers read through [`recent`],
/// which returns only the trailing window. Nothing survives a restart.
///
/// Mutual exclusion between whole requests is the job of
/// [`ConversationLocks`](crate::conversation::ConversationLocks); the lock here
/// only protects the map itself.
///
/// [`recent`]: ConversationStore::recent
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Vec<Turn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single turn, creating the conversation on first use.
    pub fn append(&self, conversation_id: &str, turn: Turn) -> CoreResult<()> {
        validate_id(conversation_id)?;
        let mut conversations = self.write()?;
        conversations
            .entry(conversation_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }

    /// Append a user turn and its assistant reply under one write lock, so
    /// readers never observe half of an exchange.
    pub fn append_exchange(
        &self,
        conversation_id: &str,
        user: Turn,
        assistant: Turn,
    ) -> CoreResult<()> {
        validate_id(conversation_id)?;
        let mut conversations = self.write()?;
        let turns = conversations
            .entry(conversation_id.to_string())
            .or_default();
        turns.push(user);
        turns.push(assistant);
        Ok(())
    }

    /// The last `limit` turns in chronological order. Unknown ids yield an
    /// empty history.
    pub fn recent(&self, conversation_id: &str, limit: usize) -> CoreResult<Vec<Turn>> {
        let conversations = self.read()?;
        let Some(turns) = conversations.get(conversation_id) else {
            return Ok(Vec::new());
        };
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    /// Every stored turn for the conversation.
    pub fn history(&self, conversation_id: &str) -> CoreResult<Vec<Turn>> {
        let conversations = self.read()?;
        Ok(conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn turn_count(&self, conversation_id: &str) -> CoreResult<usize> {
        let conversations = self.read()?;
        Ok(conversations.get(conversation_id).map_or(0, Vec::len))
    }

    /// Known conversation ids, sorted.
    pub fn conversation_ids(&self) -> CoreResult<Vec<String>> {
        let conversations = self.read()?;
        let mut ids: Vec<String> = conversations.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, HashMap<String, Vec<Turn>>>> {
        self.conversations
            .read()
            .map_err(|_| CoreError::Internal("conversation store lock poisoned".to_string()))
    }

    fn write(&self) -> CoreResult<RwLockWriteGuard<'_, HashMap<String, Vec<Turn>>>> {
        self.conversations
            .write()
            .map_err(|_| CoreError::Internal("conversation store lock poisoned".to_string()))
    }
}

fn validate_id(conversation_id: &str) -> CoreResult<()> {
    if conversation_id.is_empty() {
        return Err(CoreError::InvalidInput(
            "anonymous conversations are not stored".to_string(),
        ));
    }
    Ok(())
}
