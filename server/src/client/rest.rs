//! REST client for the lifecycle API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::latch::DeploymentEventsSource;
use crate::errors::LifelineError;
use crate::models::deployment::{
    DeploymentStatus, DeploymentStatusResponse, InstallServiceRequest, InstallServiceResponse,
    ServiceDeploymentEvents, UninstallServiceRequest, UninstallServiceResponse, UploadResponse,
};
use crate::models::event::LifecycleEvent;

/// HTTP client for the lifeline server
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str) -> Result<Self, LifelineError> {
        Url::parse(base_url).map_err(|e| {
            LifelineError::ConfigError(format!("invalid server base URL {base_url}: {e}"))
        })?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LifelineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LifelineError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LifelineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                reqwest::StatusCode::CONFLICT => LifelineError::DeploymentConflict(body),
                reqwest::StatusCode::NOT_FOUND => LifelineError::NotFound(body),
                _ => LifelineError::ServerError(format!("{}: {}", status, body)),
            });
        }
        Ok(response.json().await?)
    }

    /// Upload a service package
    pub async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadResponse, LifelineError> {
        let url = format!("{}/upload/{}", self.base_url, name);
        debug!("POST {} ({} bytes)", url, bytes.len());

        let response = self.client.post(&url).body(bytes).send().await?;
        Self::parse(response).await
    }

    /// Install a service from a previously uploaded package
    pub async fn install_service(
        &self,
        app_name: &str,
        service_name: &str,
        request: &InstallServiceRequest,
    ) -> Result<InstallServiceResponse, LifelineError> {
        self.post(
            &format!("/deployments/{}/services/{}", app_name, service_name),
            request,
        )
        .await
    }

    /// Uninstall a service
    pub async fn uninstall_service(
        &self,
        app_name: &str,
        service_name: &str,
        request: &UninstallServiceRequest,
    ) -> Result<UninstallServiceResponse, LifelineError> {
        let url = format!(
            "{}/deployments/{}/services/{}",
            self.base_url, app_name, service_name
        );
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).json(request).send().await?;
        Self::parse(response).await
    }

    /// Ranged events query; a missing `to` lets the server substitute
    /// its page-size ceiling
    pub async fn service_events(
        &self,
        app_name: &str,
        service_name: &str,
        from: u64,
        to: Option<u64>,
    ) -> Result<ServiceDeploymentEvents, LifelineError> {
        let mut path = format!(
            "/deployments/{}/services/{}/events?from={}",
            app_name, service_name, from
        );
        if let Some(to) = to {
            path.push_str(&format!("&to={}", to));
        }
        self.get(&path).await
    }

    /// Status of a tracked deployment
    pub async fn deployment_status(
        &self,
        deployment_id: &Uuid,
    ) -> Result<DeploymentStatusResponse, LifelineError> {
        self.get(&format!("/deployments/{}/status", deployment_id))
            .await
    }

    /// Cancel the poller for a deployment
    pub async fn cancel_deployment(
        &self,
        deployment_id: &Uuid,
    ) -> Result<DeploymentStatusResponse, LifelineError> {
        self.post(&format!("/deployments/{}/cancel", deployment_id), &())
            .await
    }

    /// Bind a deployment into a source the wait latch can poll
    pub fn deployment_handle(
        &self,
        app_name: &str,
        service_name: &str,
        deployment_id: Uuid,
    ) -> RestDeploymentHandle {
        RestDeploymentHandle {
            client: self.clone(),
            app_name: app_name.to_string(),
            service_name: service_name.to_string(),
            deployment_id,
        }
    }
}

/// One deployment's query/status surface, bound over the REST client
pub struct RestDeploymentHandle {
    client: RestClient,
    app_name: String,
    service_name: String,
    deployment_id: Uuid,
}

#[async_trait]
impl DeploymentEventsSource for RestDeploymentHandle {
    async fn events(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<LifecycleEvent>, LifelineError> {
        let response = self
            .client
            .service_events(&self.app_name, &self.service_name, from, to)
            .await?;
        Ok(response.events)
    }

    async fn status(&self) -> Result<DeploymentStatus, LifelineError> {
        let response = self.client.deployment_status(&self.deployment_id).await?;
        Ok(response.status)
    }
}
