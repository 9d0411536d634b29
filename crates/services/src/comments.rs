use std::sync::Arc;

use domains::{
    Actor, Comment, CommentRepository, DocumentRepository, DomainError, ItemKind, NewComment,
    NoteRepository, Result, UserRepository,
};

use crate::{required, AccessControl};

/// Comments on documents and notes, gated by the parent item's visibility.
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    documents: Arc<dyn DocumentRepository>,
    notes: Arc<dyn NoteRepository>,
    users: Arc<dyn UserRepository>,
    access: AccessControl,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        documents: Arc<dyn DocumentRepository>,
        notes: Arc<dyn NoteRepository>,
        users: Arc<dyn UserRepository>,
        access: AccessControl,
    ) -> Self {
        Self { comments, documents, notes, users, access }
    }

    pub async fn add(&self, actor: Actor, kind: ItemKind, item_id: i64, content: &str) -> Result<i64> {
        let content = required("content", content)?;
        self.ensure_parent(actor, kind, item_id).await?;

        let id = self
            .comments
            .create(NewComment { content, user_id: actor.id, item_type: kind, item_id })
            .await?;
        self.users.touch_last_access(actor.id).await?;
        Ok(id)
    }

    pub async fn list(&self, actor: Actor, kind: ItemKind, item_id: i64) -> Result<Vec<Comment>> {
        self.ensure_parent(actor, kind, item_id).await?;
        self.comments.list(kind, item_id).await
    }

    async fn ensure_parent(&self, actor: Actor, kind: ItemKind, item_id: i64) -> Result<()> {
        let exists = match kind {
            ItemKind::Document => self.documents.find(item_id).await?.is_some(),
            ItemKind::Note => self.notes.find(item_id).await?.is_some(),
        };
        if !exists {
            return Err(DomainError::not_found(kind.as_str(), item_id));
        }
        let viewer = self.access.viewer(actor).await?;
        self.access.ensure_visible(&viewer, kind, item_id).await
    }
}
