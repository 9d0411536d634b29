use std::sync::Arc;

use domains::{
    ActivityKind, ActivityRepository, Actor, Assignments, Audience, DomainError, ItemActivity,
    ItemKind, NewNote, Note, NoteRepository, NoteStats, NoteView, Result, UserRepository,
};

use crate::{required, AccessControl, NotificationService};

#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    fn validated(&self) -> Result<(String, String)> {
        Ok((required("title", &self.title)?, required("content", &self.content)?))
    }
}

pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    activity: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
    access: AccessControl,
    notifications: NotificationService,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        activity: Arc<dyn ActivityRepository>,
        users: Arc<dyn UserRepository>,
        access: AccessControl,
        notifications: NotificationService,
    ) -> Self {
        Self { notes, activity, users, access, notifications }
    }

    pub async fn list_for(&self, actor: Actor) -> Result<Vec<NoteView>> {
        let viewer = self.access.viewer(actor).await?;
        self.notes.list_visible(&viewer).await
    }

    pub async fn list_all(&self) -> Result<Vec<NoteStats>> {
        self.notes.list_all().await
    }

    pub async fn get(&self, actor: Actor, id: i64) -> Result<NoteView> {
        let view = self
            .notes
            .find_view(id, actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("note", id))?;
        let viewer = self.access.viewer(actor).await?;
        self.access.ensure_visible(&viewer, ItemKind::Note, id).await?;
        Ok(view)
    }

    #[tracing::instrument(skip(self, draft, audience), fields(user_id = actor.id))]
    pub async fn create(&self, actor: Actor, draft: NoteDraft, audience: Audience) -> Result<Note> {
        let (title, content) = draft.validated()?;
        let grants = Assignments::from(&audience);
        let note = self
            .notes
            .create(NewNote { title, content, created_by: actor.id }, audience)
            .await?;

        tracing::info!(note_id = note.id, "note published");
        self.notifications.announce(ItemKind::Note, &note.title, actor, &grants).await;
        Ok(note)
    }

    /// Edit from the user-facing API: only the author, or an administrator.
    pub async fn update_own(
        &self,
        actor: Actor,
        id: i64,
        draft: NoteDraft,
        audience: Option<Audience>,
    ) -> Result<()> {
        let (title, content) = draft.validated()?;
        let note = self.find(id).await?;
        if note.created_by != actor.id && !actor.is_admin() {
            return Err(DomainError::AccessDenied);
        }
        self.notes.update(id, title, content, audience).await
    }

    pub async fn update(&self, id: i64, draft: NoteDraft) -> Result<()> {
        let (title, content) = draft.validated()?;
        self.find(id).await?;
        self.notes.update(id, title, content, None).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.find(id).await?;
        self.notes.delete(id).await?;
        tracing::info!(note_id = id, "note deleted");
        Ok(())
    }

    pub async fn record_read(&self, actor: Actor, id: i64) -> Result<()> {
        self.find(id).await?;
        let viewer = self.access.viewer(actor).await?;
        self.access.ensure_visible(&viewer, ItemKind::Note, id).await?;

        self.activity.record(ItemKind::Note, id, actor.id, ActivityKind::Read).await?;
        self.users.touch_last_access(actor.id).await
    }

    pub async fn assignments(&self, id: i64) -> Result<Assignments> {
        self.find(id).await?;
        self.access.assignments(ItemKind::Note, id).await
    }

    /// Grants of a note, for its author or anyone who can see it.
    pub async fn grants_for(&self, actor: Actor, id: i64) -> Result<Assignments> {
        let note = self.find(id).await?;
        if note.created_by != actor.id {
            let viewer = self.access.viewer(actor).await?;
            self.access.ensure_visible(&viewer, ItemKind::Note, id).await?;
        }
        self.access.assignments(ItemKind::Note, id).await
    }

    pub async fn set_visibility(&self, id: i64, audience: Audience) -> Result<()> {
        self.find(id).await?;
        self.access.replace(ItemKind::Note, id, audience).await
    }

    /// Notes have reads only.
    pub async fn activity(&self, id: i64) -> Result<ItemActivity> {
        self.find(id).await?;
        let reads = self.activity.events(ItemKind::Note, id, ActivityKind::Read).await?;
        Ok(ItemActivity { reads, downloads: None })
    }

    async fn find(&self, id: i64) -> Result<Note> {
        self.notes
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found("note", id))
    }
}
