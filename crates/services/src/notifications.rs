use std::sync::Arc;

use domains::{
    Actor, Assignments, DomainError, ItemKind, NewNotification, Notification,
    NotificationRepository, Result, UserRepository,
};

const INBOX_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { notifications, users }
    }

    /// The caller's most recent notifications.
    pub async fn list(&self, actor: Actor) -> Result<Vec<Notification>> {
        let items = self.notifications.list(actor.id, INBOX_LIMIT).await?;
        self.users.touch_last_access(actor.id).await?;
        Ok(items)
    }

    pub async fn mark_read(&self, actor: Actor, id: i64) -> Result<()> {
        if self.notifications.mark_read(id, actor.id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("notification", id))
        }
    }

    /// Notifies everyone covered by `grants` except the author.
    ///
    /// Publishing never fails because of this: errors are logged and dropped.
    pub async fn announce(&self, kind: ItemKind, title: &str, author: Actor, grants: &Assignments) {
        if let Err(err) = self.try_announce(kind, title, author, grants).await {
            tracing::warn!(error = %err, %kind, "failed to create notifications");
        }
    }

    async fn try_announce(
        &self,
        kind: ItemKind,
        title: &str,
        author: Actor,
        grants: &Assignments,
    ) -> Result<()> {
        let (heading, noun) = match kind {
            ItemKind::Document => ("New document available", "document"),
            ItemKind::Note => ("New note available", "note"),
        };

        let author_name = match self.users.find(author.id).await? {
            Some(user) => user.full_name(),
            None => "An administrator".to_string(),
        };

        let recipients: Vec<NewNotification> = self
            .users
            .audience(grants)
            .await?
            .into_iter()
            .filter(|id| *id != author.id)
            .map(|user_id| NewNotification {
                user_id,
                title: heading.to_string(),
                message: format!("{author_name} shared the {noun} \"{title}\" with you"),
                kind,
            })
            .collect();

        if recipients.is_empty() {
            return Ok(());
        }
        let count = recipients.len();
        self.notifications.create_many(recipients).await?;
        tracing::debug!(%kind, count, "notifications created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockNotificationRepository, MockUserRepository, Role};

    #[tokio::test]
    async fn announce_skips_the_author() {
        let mut users = MockUserRepository::new();
        users.expect_find().returning(|_| Ok(None));
        users.expect_audience().returning(|_| Ok(vec![1, 4, 6]));
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_create_many()
            .withf(|rows| {
                rows.iter().map(|r| r.user_id).collect::<Vec<_>>() == vec![4, 6]
                    && rows.iter().all(|r| r.title == "New note available")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = NotificationService::new(Arc::new(notifications), Arc::new(users));
        let grants = Assignments { departments: vec![2], users: vec![] };
        service
            .announce(ItemKind::Note, "Closure", Actor { id: 1, role: Role::Administrator }, &grants)
            .await;
    }

    #[tokio::test]
    async fn announce_swallows_storage_errors() {
        let mut users = MockUserRepository::new();
        users.expect_find().returning(|_| Ok(None));
        users.expect_audience().returning(|_| Err(DomainError::internal("db down")));

        let service =
            NotificationService::new(Arc::new(MockNotificationRepository::new()), Arc::new(users));
        service
            .announce(ItemKind::Document, "Plan", Actor { id: 1, role: Role::User }, &Assignments::default())
            .await;
    }

    #[tokio::test]
    async fn marking_someone_elses_notification_is_not_found() {
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_mark_read().returning(|_, _| Ok(false));

        let service =
            NotificationService::new(Arc::new(notifications), Arc::new(MockUserRepository::new()));
        let err = service.mark_read(Actor { id: 2, role: Role::User }, 9).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "notification", id: 9 }));
    }
}
