use std::sync::Arc;

use domains::{merge_audit_log, ActivityRepository, AuditEntry, LogFilter, Result};

const PER_CATEGORY: i64 = 100;
const MAX_ENTRIES: usize = 200;

/// Global read/download log for administrators.
pub struct AuditService {
    activity: Arc<dyn ActivityRepository>,
}

impl AuditService {
    pub fn new(activity: Arc<dyn ActivityRepository>) -> Self {
        Self { activity }
    }

    pub async fn log(&self, filter: LogFilter) -> Result<Vec<AuditEntry>> {
        let mut batches = Vec::new();
        for category in filter.categories() {
            batches.push(self.activity.recent(category, PER_CATEGORY).await?);
        }
        Ok(merge_audit_log(batches, MAX_ENTRIES))
    }
}
