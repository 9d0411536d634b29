//! Prometheus counters for portal activity.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use domains::{ActivityKind, ItemKind};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ActivityLabels {
    pub item: String,
    pub event: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LoginLabels {
    pub outcome: String,
}

pub struct Metrics {
    registry: Registry,
    activity: Family<ActivityLabels, Counter>,
    logins: Family<LoginLabels, Counter>,
    uploads: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("portal");

        let activity = Family::<ActivityLabels, Counter>::default();
        registry.register("activity_events", "Read and download events", activity.clone());

        let logins = Family::<LoginLabels, Counter>::default();
        registry.register("logins", "Login attempts by outcome", logins.clone());

        let uploads = Counter::default();
        registry.register("document_uploads", "Documents published", uploads.clone());

        Self { registry, activity, logins, uploads }
    }

    pub fn record_activity(&self, item: ItemKind, event: ActivityKind) {
        self.activity
            .get_or_create(&ActivityLabels {
                item: item.as_str().to_string(),
                event: event.as_str().to_string(),
            })
            .inc();
    }

    pub fn record_login(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.logins.get_or_create(&LoginLabels { outcome: outcome.to_string() }).inc();
    }

    pub fn record_upload(&self) {
        self.uploads.inc();
    }

    /// OpenMetrics text exposition.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = Metrics::new();
        metrics.record_activity(ItemKind::Document, ActivityKind::Read);
        metrics.record_activity(ItemKind::Document, ActivityKind::Read);
        metrics.record_login(false);

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"portal_activity_events_total{item="document",event="read"} 2"#));
        assert!(text.contains(r#"portal_logins_total{outcome="failure"} 1"#));
        assert!(text.contains("portal_document_uploads_total 0"));
    }
}
