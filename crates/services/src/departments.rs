use std::sync::Arc;

use domains::{
    Department, DepartmentRepository, DepartmentSummary, DomainError, NewDepartment, Result,
};

use crate::{optional, required};

pub struct DepartmentService {
    departments: Arc<dyn DepartmentRepository>,
}

impl DepartmentService {
    pub fn new(departments: Arc<dyn DepartmentRepository>) -> Self {
        Self { departments }
    }

    pub async fn list(&self) -> Result<Vec<DepartmentSummary>> {
        self.departments.list().await
    }

    pub async fn create(&self, name: &str, description: Option<String>) -> Result<Department> {
        let name = required("department name", name)?;
        let department = self
            .departments
            .create(NewDepartment { name, description: optional(description) })
            .await?;
        tracing::info!(department_id = department.id, name = %department.name, "department created");
        Ok(department)
    }

    pub async fn rename(&self, id: i64, name: &str, description: Option<String>) -> Result<()> {
        let name = required("department name", name)?;
        self.departments.rename(id, name, optional(description)).await
    }

    /// Refused while any active user is still a member.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.departments.find(id).await?.is_none() {
            return Err(DomainError::not_found("department", id));
        }

        match self.departments.delete(id).await {
            Ok(()) => {
                tracing::info!(department_id = id, "department deleted");
                Ok(())
            }
            Err(err @ DomainError::DependentRecordsExist(_)) => {
                tracing::info!(department_id = id, "department delete refused");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::MockDepartmentRepository;
    use mockall::predicate::eq;

    fn finance() -> Department {
        Department { id: 3, name: "Finance".into(), description: None, created_at: Utc::now() }
    }

    #[tokio::test]
    async fn delete_is_blocked_by_active_members() {
        let mut repo = MockDepartmentRepository::new();
        repo.expect_find().with(eq(3)).returning(|_| Ok(Some(finance())));
        repo.expect_delete()
            .with(eq(3))
            .times(1)
            .returning(|_| Err(DomainError::DependentRecordsExist("2 active users".into())));

        let service = DepartmentService::new(Arc::new(repo));
        let err = service.delete(3).await.unwrap_err();
        assert!(matches!(err, DomainError::DependentRecordsExist(_)));
    }

    #[tokio::test]
    async fn delete_succeeds_without_members() {
        let mut repo = MockDepartmentRepository::new();
        repo.expect_find().returning(|_| Ok(Some(finance())));
        repo.expect_delete().with(eq(3)).times(1).returning(|_| Ok(()));

        DepartmentService::new(Arc::new(repo)).delete(3).await.unwrap();
    }

    #[tokio::test]
    async fn blank_names_are_rejected_before_storage() {
        let mut repo = MockDepartmentRepository::new();
        repo.expect_create().never();

        let err = DepartmentService::new(Arc::new(repo)).create("  ", None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
