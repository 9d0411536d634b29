//! # Visibility rules
//!
//! Visibility is never an attribute of a document or note. It is derived from
//! two grant tables per item kind: one keyed by department, one keyed by user.
//! A row in either table is enough to see the item; administrators see
//! everything.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, Result};
use crate::models::Role;

/// The caller as seen by the visibility rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub role: Role,
    /// Every department the user belongs to
    pub department_ids: Vec<i64>,
}

impl Viewer {
    pub fn new(user_id: i64, role: Role, department_ids: Vec<i64>) -> Self {
        Self { user_id, role, department_ids }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Which grant table an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceKind {
    Departments,
    Users,
}

/// A validated, non-empty replacement grant set. Department and user grants
/// may be mixed; each list is deduplicated and ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience {
    departments: Vec<i64>,
    users: Vec<i64>,
}

fn sorted_unique(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

impl Audience {
    /// Rejects a set with no department and no user.
    pub fn mixed(
        departments: impl IntoIterator<Item = i64>,
        users: impl IntoIterator<Item = i64>,
    ) -> Result<Self> {
        let audience = Self { departments: sorted_unique(departments), users: sorted_unique(users) };
        if audience.departments.is_empty() && audience.users.is_empty() {
            return Err(DomainError::validation(
                "at least one department or user must be selected",
            ));
        }
        Ok(audience)
    }

    /// Grants of a single kind.
    pub fn new(kind: AudienceKind, ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        match kind {
            AudienceKind::Departments => Self::mixed(ids, Vec::<i64>::new()),
            AudienceKind::Users => Self::mixed(Vec::<i64>::new(), ids),
        }
    }

    pub fn departments(ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        Self::new(AudienceKind::Departments, ids)
    }

    pub fn users(ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        Self::new(AudienceKind::Users, ids)
    }

    pub fn department_ids(&self) -> &[i64] {
        &self.departments
    }

    pub fn user_ids(&self) -> &[i64] {
        &self.users
    }
}

/// The current grant rows of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignments {
    pub departments: Vec<i64>,
    pub users: Vec<i64>,
}

impl Assignments {
    /// `Users` only when there are user grants and no department grants.
    pub fn kind(&self) -> AudienceKind {
        if self.departments.is_empty() && !self.users.is_empty() {
            AudienceKind::Users
        } else {
            AudienceKind::Departments
        }
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.users.is_empty()
    }
}

impl From<&Audience> for Assignments {
    fn from(audience: &Audience) -> Self {
        Self { departments: audience.departments.clone(), users: audience.users.clone() }
    }
}

/// Single-item check.
pub fn can_view(viewer: &Viewer, grants: &Assignments) -> bool {
    viewer.is_admin()
        || grants.users.contains(&viewer.user_id)
        || grants.departments.iter().any(|d| viewer.department_ids.contains(d))
}

/// Resolves the visible subset of an in-memory grant table.
pub fn resolve<'a, I>(viewer: &Viewer, grants: I) -> BTreeSet<i64>
where
    I: IntoIterator<Item = (i64, &'a Assignments)>,
{
    grants
        .into_iter()
        .filter(|(_, g)| can_view(viewer, g))
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: i64, departments: &[i64]) -> Viewer {
        Viewer::new(user_id, Role::User, departments.to_vec())
    }

    #[test]
    fn department_grant_matches_any_membership() {
        let grants = Assignments { departments: vec![2, 7], users: vec![] };
        assert!(can_view(&member(1, &[3, 7]), &grants));
        assert!(!can_view(&member(1, &[3]), &grants));
    }

    #[test]
    fn user_grant_ignores_departments() {
        let grants = Assignments { departments: vec![], users: vec![9] };
        assert!(can_view(&member(9, &[]), &grants));
        assert!(!can_view(&member(8, &[1, 2, 3]), &grants));
    }

    #[test]
    fn administrators_bypass_grants() {
        let admin = Viewer::new(1, Role::Administrator, vec![]);
        assert!(can_view(&admin, &Assignments::default()));
    }

    #[test]
    fn resolve_unions_both_tables() {
        let by_dept = Assignments { departments: vec![3], users: vec![] };
        let by_user = Assignments { departments: vec![], users: vec![5] };
        let hidden = Assignments { departments: vec![7], users: vec![] };
        let table = vec![(10, &by_dept), (11, &by_user), (12, &hidden)];

        let visible = resolve(&member(5, &[3]), table);
        assert_eq!(visible.into_iter().collect::<Vec<_>>(), vec![10, 11]);
    }

    #[test]
    fn audience_rejects_empty_and_dedups() {
        assert!(matches!(Audience::users(Vec::new()), Err(DomainError::Validation(_))));
        let audience = Audience::departments(vec![2, 1, 2]).unwrap();
        assert_eq!(audience.department_ids(), &[1, 2]);
        assert!(audience.user_ids().is_empty());
    }

    #[test]
    fn mixed_audience_keeps_both_lists() {
        let audience = Audience::mixed(vec![3], vec![9, 4, 9]).unwrap();
        assert_eq!(audience.department_ids(), &[3]);
        assert_eq!(audience.user_ids(), &[4, 9]);
        assert!(matches!(Audience::mixed(Vec::<i64>::new(), Vec::<i64>::new()), Err(DomainError::Validation(_))));

        let grants = Assignments::from(&audience);
        assert!(can_view(&member(4, &[]), &grants));
        assert!(can_view(&member(1, &[3]), &grants));
        assert!(!can_view(&member(1, &[2]), &grants));
    }

    #[test]
    fn assignment_kind_prefers_departments() {
        let mixed = Assignments { departments: vec![1], users: vec![2] };
        assert_eq!(mixed.kind(), AudienceKind::Departments);
        let users_only = Assignments { departments: vec![], users: vec![2] };
        assert_eq!(users_only.kind(), AudienceKind::Users);
        assert_eq!(Assignments::default().kind(), AudienceKind::Departments);
    }
}
