//! HTTP-backed orchestrator client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::errors::LifelineError;
use crate::models::event::InstanceStateChange;
use crate::orchestrator::Orchestrator;
use crate::repo::UploadedBlob;

/// Orchestrator client over its management HTTP API
pub struct HttpOrchestrator {
    client: Client,
    base_url: String,
}

impl HttpOrchestrator {
    pub fn new(base_url: &str) -> Result<Self, LifelineError> {
        Url::parse(base_url).map_err(|e| {
            LifelineError::ConfigError(format!("invalid orchestrator base URL {base_url}: {e}"))
        })?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, LifelineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LifelineError::OrchestratorQuery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LifelineError::OrchestratorQuery(format!(
                "{}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LifelineError::OrchestratorQuery(e.to_string()))
    }

    async fn post_empty(&self, path: &str) -> Result<(), LifelineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| LifelineError::OrchestratorQuery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LifelineError::OrchestratorQuery(format!(
                "{}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PlannedInstancesResponse {
    planned_instances: u32,
}

#[derive(Debug, Deserialize)]
struct StateChangesResponse {
    changes: Vec<InstanceStateChange>,
}

#[derive(Debug, Deserialize)]
struct UndeployCompleteResponse {
    complete: bool,
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn planned_instance_count(&self, service_name: &str) -> Result<u32, LifelineError> {
        let response: PlannedInstancesResponse = self
            .get_json(&format!("/services/{}/planned", service_name))
            .await?;
        Ok(response.planned_instances)
    }

    async fn instance_state_changes_since(
        &self,
        service_name: &str,
        watermark: u64,
    ) -> Result<Vec<InstanceStateChange>, LifelineError> {
        let response: StateChangesResponse = self
            .get_json(&format!(
                "/services/{}/changes?since={}",
                service_name, watermark
            ))
            .await?;
        Ok(response.changes)
    }

    async fn is_undeploy_complete(&self, service_name: &str) -> Result<bool, LifelineError> {
        let response: UndeployCompleteResponse = self
            .get_json(&format!("/services/{}/undeploy/complete", service_name))
            .await?;
        Ok(response.complete)
    }

    async fn deploy_service(
        &self,
        service_name: &str,
        package: &UploadedBlob,
        planned_instances: u32,
    ) -> Result<(), LifelineError> {
        let url = format!(
            "{}/services/{}/deploy?planned_instances={}",
            self.base_url, service_name, planned_instances
        );
        debug!("POST {} ({} bytes)", url, package.bytes.len());

        let response = self
            .client
            .post(&url)
            .header("X-Package-Name", &package.name)
            .header("X-Package-Digest", &package.digest)
            .body(package.bytes.clone())
            .send()
            .await
            .map_err(|e| LifelineError::OrchestratorQuery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LifelineError::OrchestratorQuery(format!(
                "Deploy failed: {} - {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn undeploy_service(&self, service_name: &str) -> Result<(), LifelineError> {
        self.post_empty(&format!("/services/{}/undeploy", service_name))
            .await
    }
}
