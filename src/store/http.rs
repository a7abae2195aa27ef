/// HTTP vitals sink
///
/// Used by the bridge: POSTs each sample to the hub's `/api/vitals` and reads
/// back the stored record.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{StoredVitals, VitalsSink};
use crate::errors::{RelayError, RelayResult};
use crate::vitals::VitalsSample;

pub struct HttpVitalsSink {
    client: Client,
    url: String,
}

impl HttpVitalsSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download URL served next to the POST endpoint
    fn history_url(&self) -> String {
        match self.url.strip_suffix("/api/vitals") {
            Some(base) => format!("{}/api/admin/vitals/download", base),
            None => format!("{}/admin/vitals/download", self.url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl VitalsSink for HttpVitalsSink {
    async fn save(&self, sample: &VitalsSample) -> RelayResult<StoredVitals> {
        let response = self.client.post(&self.url).json(sample).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Http(format!("{} returned {}: {}", self.url, status, body)));
        }
        Ok(response.json::<StoredVitals>().await?)
    }

    async fn history(&self) -> RelayResult<Vec<StoredVitals>> {
        let url = self.history_url();
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Http(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.json::<Vec<StoredVitals>>().await?)
    }
}
