//! Visibility resolution against the grant tables.

use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    can_view, Actor, Assignments, Audience, DomainError, ItemKind, Result, UserRepository, Viewer,
    VisibilityRepository,
};

/// Decides which items an actor may see, and edits grant sets.
#[derive(Clone)]
pub struct AccessControl {
    users: Arc<dyn UserRepository>,
    grants: Arc<dyn VisibilityRepository>,
}

impl AccessControl {
    pub fn new(users: Arc<dyn UserRepository>, grants: Arc<dyn VisibilityRepository>) -> Self {
        Self { users, grants }
    }

    /// Builds the viewer from the current membership rows, not the token,
    /// so department changes apply without a new login.
    pub async fn viewer(&self, actor: Actor) -> Result<Viewer> {
        if actor.is_admin() {
            return Ok(Viewer::new(actor.id, actor.role, Vec::new()));
        }
        let departments = self.users.department_ids(actor.id).await?;
        Ok(Viewer::new(actor.id, actor.role, departments))
    }

    pub async fn ensure_visible(&self, viewer: &Viewer, kind: ItemKind, item_id: i64) -> Result<()> {
        if viewer.is_admin() {
            return Ok(());
        }
        let grants = self.grants.grants(kind, item_id).await?;
        if can_view(viewer, &grants) {
            Ok(())
        } else {
            tracing::debug!(user_id = viewer.user_id, %kind, item_id, "visibility check refused");
            Err(DomainError::AccessDenied)
        }
    }

    /// Every item id of `kind` the actor may see.
    pub async fn visible_ids(&self, actor: Actor, kind: ItemKind) -> Result<BTreeSet<i64>> {
        let viewer = self.viewer(actor).await?;
        let ids = self.grants.visible_ids(kind, &viewer).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn assignments(&self, kind: ItemKind, item_id: i64) -> Result<Assignments> {
        self.grants.grants(kind, item_id).await
    }

    pub async fn replace(&self, kind: ItemKind, item_id: i64, audience: Audience) -> Result<()> {
        tracing::info!(
            %kind,
            item_id,
            departments = audience.department_ids().len(),
            users = audience.user_ids().len(),
            "replacing visibility"
        );
        self.grants.replace(kind, item_id, audience).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockUserRepository, MockVisibilityRepository, Role};
    use mockall::predicate::eq;

    fn member() -> Actor {
        Actor { id: 5, role: Role::User }
    }

    #[tokio::test]
    async fn refuses_items_outside_grants() {
        let mut users = MockUserRepository::new();
        users.expect_department_ids().with(eq(5)).returning(|_| Ok(vec![3]));
        let mut grants = MockVisibilityRepository::new();
        grants
            .expect_grants()
            .with(eq(ItemKind::Document), eq(40))
            .returning(|_, _| Ok(Assignments { departments: vec![7], users: vec![] }));

        let access = AccessControl::new(Arc::new(users), Arc::new(grants));
        let viewer = access.viewer(member()).await.unwrap();
        let err = access.ensure_visible(&viewer, ItemKind::Document, 40).await.unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));
    }

    #[tokio::test]
    async fn administrators_skip_grant_lookup() {
        let users = MockUserRepository::new();
        let grants = MockVisibilityRepository::new();
        let access = AccessControl::new(Arc::new(users), Arc::new(grants));

        let viewer = access.viewer(Actor { id: 1, role: Role::Administrator }).await.unwrap();
        access.ensure_visible(&viewer, ItemKind::Note, 99).await.unwrap();
    }

    #[tokio::test]
    async fn visible_ids_use_current_memberships() {
        let mut users = MockUserRepository::new();
        users.expect_department_ids().returning(|_| Ok(vec![3, 4]));
        let mut grants = MockVisibilityRepository::new();
        grants
            .expect_visible_ids()
            .withf(|kind, viewer| *kind == ItemKind::Note && viewer.department_ids == vec![3, 4])
            .returning(|_, _| Ok(vec![8, 2, 8]));

        let access = AccessControl::new(Arc::new(users), Arc::new(grants));
        let ids = access.visible_ids(member(), ItemKind::Note).await.unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2, 8]);
    }
}
