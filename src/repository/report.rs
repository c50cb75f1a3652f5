//! Statistics and health reports

use serde::Serialize;

use crate::model::Collection;

/// Per-collection document counts.
///
/// Counts are absent when the store is disconnected or counting failed;
/// `error` carries the failure message in the latter case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Whether the store was reachable
    pub connected: bool,
    /// Database name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Number of experiments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiments_count: Option<u64>,
    /// Number of datasets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasets_count: Option<u64>,
    /// Number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_count: Option<u64>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Statistics {
    pub(crate) const fn disconnected() -> Self {
        Self {
            connected: false,
            database: None,
            experiments_count: None,
            datasets_count: None,
            results_count: None,
            error: None,
        }
    }

    pub(crate) fn connected(database: &str) -> Self {
        Self {
            connected: true,
            database: Some(database.to_string()),
            experiments_count: Some(0),
            datasets_count: Some(0),
            results_count: Some(0),
            error: None,
        }
    }

    pub(crate) fn failed(error: String) -> Self {
        Self {
            connected: true,
            error: Some(error),
            ..Self::disconnected()
        }
    }

    pub(crate) fn set_count(&mut self, collection: Collection, count: u64) {
        let slot = match collection {
            Collection::Experiments => &mut self.experiments_count,
            Collection::Datasets => &mut self.datasets_count,
            Collection::Results => &mut self.results_count,
        };
        *slot = Some(count);
    }

    /// Count for one collection.
    #[must_use]
    pub const fn count(&self, collection: Collection) -> Option<u64> {
        match collection {
            Collection::Experiments => self.experiments_count,
            Collection::Datasets => self.datasets_count,
            Collection::Results => self.results_count,
        }
    }
}

/// Outcome of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store handle reports no connection
    Disconnected,
    /// Ping succeeded
    Healthy,
    /// Connected but the ping failed
    Unhealthy,
}

impl HealthStatus {
    /// Lowercase tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// Health probe result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Outcome
    pub status: HealthStatus,
    /// Human-readable detail
    pub message: String,
    /// Database name, when healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl HealthReport {
    pub(crate) fn disconnected() -> Self {
        Self {
            status: HealthStatus::Disconnected,
            message: "Document store not connected".to_string(),
            database: None,
        }
    }

    pub(crate) fn healthy(database: &str) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: "Connection is healthy".to_string(),
            database: Some(database.to_string()),
        }
    }

    pub(crate) const fn unhealthy(message: String) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message,
            database: None,
        }
    }

    /// Whether the probe succeeded.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_statistics_serialize_without_counts() {
        let json = serde_json::to_value(Statistics::disconnected()).unwrap();
        assert_eq!(json, serde_json::json!({ "connected": false }));
    }

    #[test]
    fn test_set_count() {
        let mut stats = Statistics::connected("db");
        stats.set_count(Collection::Results, 7);
        assert_eq!(stats.count(Collection::Results), Some(7));
        assert_eq!(stats.count(Collection::Experiments), Some(0));
    }

    #[test]
    fn test_failed_statistics_keep_connected_flag() {
        let stats = Statistics::failed("boom".into());
        assert!(stats.connected);
        assert_eq!(stats.error.as_deref(), Some("boom"));
        assert_eq!(stats.experiments_count, None);
    }

    #[test]
    fn test_health_status_serializes_lowercase() {
        let json = serde_json::to_value(HealthReport::healthy("db")).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "db");
        assert!(HealthReport::healthy("db").is_healthy());
        assert!(!HealthReport::disconnected().is_healthy());
    }
}
