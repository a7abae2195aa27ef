/// Vitals persistence
///
/// The relay only needs one thing from storage: hand over a sample and hear
/// back whether it was kept. `VitalsSink` is that contract; the hub writes
/// through `SqliteVitalsStore`, the bridge through `HttpVitalsSink`.
///
/// Writes never sit on the relay path. `persist_in_background` spawns each
/// save under a timeout and only logs the outcome.
pub mod http;
pub mod sqlite;

pub use http::HttpVitalsSink;
pub use sqlite::SqliteVitalsStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::errors::{RelayError, RelayResult};
use crate::logger::{self, LogTag};
use crate::vitals::VitalsSample;

/// A persisted sample as returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVitals {
    pub id: i64,
    #[serde(flatten)]
    pub sample: VitalsSample,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait VitalsSink: Send + Sync {
    async fn save(&self, sample: &VitalsSample) -> RelayResult<StoredVitals>;

    /// Every stored sample, oldest first
    async fn history(&self) -> RelayResult<Vec<StoredVitals>>;
}

/// Save without blocking the caller; failures are logged, never retried
pub fn persist_in_background(
    sink: Arc<dyn VitalsSink>,
    sample: VitalsSample,
    timeout: Duration,
) -> JoinHandle<RelayResult<StoredVitals>> {
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, sink.save(&sample)).await {
            Ok(Ok(stored)) => Ok(stored),
            Ok(Err(e)) => Err(RelayError::persistence(e)),
            Err(_) => Err(RelayError::Timeout {
                seconds: timeout.as_secs(),
            }),
        };

        match &result {
            Ok(stored) => {
                logger::debug(LogTag::Store, &format!("Sample {} stored", stored.id));
            }
            Err(e) => {
                logger::warning(LogTag::Store, &format!("Sample not persisted: {}", e));
            }
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::{normalize, parse_frame};

    struct SlowSink;

    #[async_trait]
    impl VitalsSink for SlowSink {
        async fn save(&self, _sample: &VitalsSample) -> RelayResult<StoredVitals> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(RelayError::persistence("unreachable"))
        }

        async fn history(&self) -> RelayResult<Vec<StoredVitals>> {
            Ok(Vec::new())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl VitalsSink for FailingSink {
        async fn save(&self, _sample: &VitalsSample) -> RelayResult<StoredVitals> {
            Err(RelayError::Http("503".to_string()))
        }

        async fn history(&self) -> RelayResult<Vec<StoredVitals>> {
            Ok(Vec::new())
        }
    }

    fn sample() -> VitalsSample {
        let reading = parse_frame("Oxygen % = 98%, BPM = 70, Avg BPM = 70")
            .reading()
            .unwrap();
        normalize(&reading)
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_save_times_out() {
        let result = persist_in_background(Arc::new(SlowSink), sample(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(result, Err(RelayError::Timeout { seconds: 5 })));
    }

    #[tokio::test]
    async fn test_background_save_failure_is_persistence_fault() {
        let result =
            persist_in_background(Arc::new(FailingSink), sample(), Duration::from_secs(5))
                .await
                .unwrap();
        assert!(matches!(result, Err(RelayError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_background_save_success() {
        let store = Arc::new(SqliteVitalsStore::open_in_memory().unwrap());
        let stored = persist_in_background(store.clone(), sample(), Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(store.history().await.unwrap().len(), 1);
    }

    #[test]
    fn test_stored_vitals_json_shape() {
        let stored = StoredVitals {
            id: 3,
            sample: sample(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["oxygen"], 98.0);
        assert_eq!(json["bloodPressure"]["systolic"], 107.0);
        assert!(json["createdAt"].is_string());
        assert!(json.get("sample").is_none());
    }
}
