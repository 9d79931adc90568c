//! Per-entity comment threads.
//!
//! A thread is stored as one document per entity, in append order. Comments
//! can be addressed by position (index into [`FeedbackStore::list`]) or by
//! their surrogate id. Positions shift down after a removal; ids do not.
//!
//! The acting identity is always passed in by the caller. Edits and removals
//! are refused unless its email matches the comment's author, and a refused
//! mutation never writes.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Comment, Identity};
use crate::store::{keys, Documents, DocumentsGuard, StoreError};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Comment text must not be empty")]
    EmptyText,

    #[error("No identity to attribute the comment to")]
    NoIdentity,

    #[error("Comment not found")]
    NotFound,

    #[error("Only the author may change this comment")]
    NotOwner,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a caller points at a comment.
#[derive(Debug, Clone, Copy)]
enum Locator {
    Position(usize),
    Id(Uuid),
}

impl Locator {
    fn find(self, thread: &[Comment]) -> Option<usize> {
        match self {
            Self::Position(pos) => (pos < thread.len()).then_some(pos),
            Self::Id(id) => thread.iter().position(|c| c.id == id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackStore {
    docs: Documents,
}

impl FeedbackStore {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Append a comment authored by `identity`. The text is stored trimmed.
    pub fn add(
        &self,
        entity_id: &str,
        identity: Option<&Identity>,
        text: &str,
    ) -> Result<Comment, FeedbackError> {
        let identity = identity.ok_or(FeedbackError::NoIdentity)?;
        let text = non_empty(text)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            author: identity.email.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            edited_at: None,
        };

        let key = keys::feedback(entity_id);
        let guard = self.docs.lock()?;
        let mut thread: Vec<Comment> = guard.read_or_default(&key)?;
        thread.push(comment.clone());
        guard.write(&key, &thread)?;

        tracing::info!(
            "{} commented on {} ({} comments)",
            comment.author,
            entity_id,
            thread.len()
        );
        Ok(comment)
    }

    /// Comments in append order; empty if the entity has none.
    pub fn list(&self, entity_id: &str) -> Result<Vec<Comment>, FeedbackError> {
        Ok(self
            .docs
            .lock()?
            .read_or_default(&keys::feedback(entity_id))?)
    }

    pub fn edit(
        &self,
        entity_id: &str,
        position: usize,
        identity: &Identity,
        new_text: &str,
    ) -> Result<Comment, FeedbackError> {
        self.edit_at(entity_id, Locator::Position(position), identity, new_text)
    }

    pub fn edit_by_id(
        &self,
        entity_id: &str,
        comment_id: Uuid,
        identity: &Identity,
        new_text: &str,
    ) -> Result<Comment, FeedbackError> {
        self.edit_at(entity_id, Locator::Id(comment_id), identity, new_text)
    }

    /// Remove by position. Later comments move down one position.
    pub fn remove(
        &self,
        entity_id: &str,
        position: usize,
        identity: &Identity,
    ) -> Result<Comment, FeedbackError> {
        self.remove_at(entity_id, Locator::Position(position), identity)
    }

    pub fn remove_by_id(
        &self,
        entity_id: &str,
        comment_id: Uuid,
        identity: &Identity,
    ) -> Result<Comment, FeedbackError> {
        self.remove_at(entity_id, Locator::Id(comment_id), identity)
    }

    fn edit_at(
        &self,
        entity_id: &str,
        locator: Locator,
        identity: &Identity,
        new_text: &str,
    ) -> Result<Comment, FeedbackError> {
        let key = keys::feedback(entity_id);
        let guard = self.docs.lock()?;
        let mut thread: Vec<Comment> = guard.read_or_default(&key)?;
        let index = owned_index(&thread, locator, identity, entity_id)?;
        let text = non_empty(new_text)?;

        let comment = &mut thread[index];
        comment.text = text.to_string();
        comment.edited_at = Some(Utc::now());
        let edited = comment.clone();

        guard.write(&key, &thread)?;
        tracing::info!("{} edited comment {} on {}", identity.email, edited.id, entity_id);
        Ok(edited)
    }

    fn remove_at(
        &self,
        entity_id: &str,
        locator: Locator,
        identity: &Identity,
    ) -> Result<Comment, FeedbackError> {
        let key = keys::feedback(entity_id);
        let guard = self.docs.lock()?;
        let mut thread: Vec<Comment> = guard.read_or_default(&key)?;
        let index = owned_index(&thread, locator, identity, entity_id)?;

        let removed = thread.remove(index);
        write_thread(&guard, &key, &thread)?;

        tracing::info!("{} removed comment {} on {}", identity.email, removed.id, entity_id);
        Ok(removed)
    }
}

/// Resolve the locator and check authorship before anything is written.
fn owned_index(
    thread: &[Comment],
    locator: Locator,
    identity: &Identity,
    entity_id: &str,
) -> Result<usize, FeedbackError> {
    let index = locator.find(thread).ok_or(FeedbackError::NotFound)?;
    if !thread[index].is_authored_by(&identity.email) {
        tracing::warn!(
            "{} tried to change a comment by {} on {}",
            identity.email,
            thread[index].author,
            entity_id
        );
        return Err(FeedbackError::NotOwner);
    }
    Ok(index)
}

/// An emptied thread is deleted rather than stored as `[]`.
fn write_thread(
    guard: &DocumentsGuard<'_>,
    key: &str,
    thread: &[Comment],
) -> Result<(), StoreError> {
    if thread.is_empty() {
        guard.remove(key)
    } else {
        guard.write(key, thread)
    }
}

fn non_empty(text: &str) -> Result<&str, FeedbackError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(FeedbackError::EmptyText)
    } else {
        Ok(trimmed)
    }
}
