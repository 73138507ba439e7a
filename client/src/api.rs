use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    ApiErrors, Application, Build, BuildRequest, Droplet, Page, PackageGuid,
    Relationship,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Target;
use crate::error::PlatformError;

const APPS_PER_PAGE: u32 = 100;

/// What the restage workflow needs to know about an app's current droplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentDroplet {
    pub package_guid: PackageGuid,
    pub created_at: DateTime<Utc>,
}

/// Typed access to the control plane. Calls are made exactly once; nothing
/// here retries.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn list_applications(&self) -> Result<Vec<Application>, PlatformError>;

    /// Fails with `NotFound` when the app has no current droplet.
    async fn get_current_droplet(&self, app_guid: &str) -> Result<CurrentDroplet, PlatformError>;

    async fn submit_build(&self, package_guid: &str) -> Result<Build, PlatformError>;

    async fn get_build(&self, build_guid: &str) -> Result<Build, PlatformError>;

    /// True when the platform echoes back the droplet we asked for.
    async fn assign_droplet(&self, app_guid: &str, droplet_guid: &str)
        -> Result<bool, PlatformError>;

    /// Fires the restart action; does not wait for the new state.
    async fn restart_application(&self, app_guid: &str) -> Result<(), PlatformError>;

    async fn get_application(&self, app_guid: &str) -> Result<Application, PlatformError>;
}

/// `PlatformApi` over the v3 HTTP API.
#[derive(Clone)]
pub struct CfClient {
    http: Client,
    base_url: String,
    authorization: String,
    space_guid: Option<String>,
}

impl CfClient {
    pub fn new(target: &Target) -> Result<Self, PlatformError> {
        let http = Client::builder()
            .user_agent(concat!("cf-restage-all/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, target))
    }

    pub fn with_client(http: Client, target: &Target) -> Self {
        Self {
            http,
            base_url: target.api.trim_end_matches('/').to_string(),
            authorization: target.authorization(),
            space_guid: target.space_guid.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Sends the request and hands back status and body, without judging
    /// the status.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        req: RequestBuilder,
    ) -> Result<(StatusCode, String), PlatformError> {
        debug!("{} {}", method, path);
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("{} {} -> {}", method, path, status);
        Ok((status, body))
    }

    fn decode<T: DeserializeOwned>(
        method: &Method,
        path: &str,
        status: StatusCode,
        body: &str,
    ) -> Result<T, PlatformError> {
        if !status.is_success() {
            return Err(status_error(method, path, status, body));
        }
        serde_json::from_str(body).map_err(|e| PlatformError::decode(path, e))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, PlatformError> {
        let mut req = self.request(method.clone(), path);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let (status, text) = self.execute(method.clone(), path, req).await?;
        Self::decode(&method, path, status, &text)
    }

    fn first_apps_page(&self) -> String {
        match &self.space_guid {
            Some(space) => format!("/v3/apps?per_page={APPS_PER_PAGE}&space_guids={space}"),
            None => format!("/v3/apps?per_page={APPS_PER_PAGE}"),
        }
    }
}

fn status_error(method: &Method, path: &str, status: StatusCode, body: &str) -> PlatformError {
    let detail = serde_json::from_str::<ApiErrors>(body)
        .ok()
        .and_then(|errs| errs.first_detail().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    PlatformError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
        detail,
    }
}

#[async_trait]
impl PlatformApi for CfClient {
    async fn list_applications(&self) -> Result<Vec<Application>, PlatformError> {
        let mut apps = Vec::new();
        let mut next = Some(self.first_apps_page());

        while let Some(path) = next {
            let page: Page<Application> = self.call(Method::GET, &path, None).await?;
            next = page.next_href().map(str::to_string);
            apps.extend(page.resources);
        }

        Ok(apps)
    }

    async fn get_current_droplet(&self, app_guid: &str) -> Result<CurrentDroplet, PlatformError> {
        let path = format!("/v3/apps/{app_guid}/droplets/current");
        let req = self.request(Method::GET, &path);
        let (status, body) = self.execute(Method::GET, &path, req).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(format!(
                "current droplet for app {app_guid}"
            )));
        }
        let droplet: Droplet = Self::decode(&Method::GET, &path, status, &body)?;
        let package_guid = droplet.package_guid().ok_or_else(|| {
            PlatformError::NotFound(format!("package for droplet {}", droplet.guid))
        })?;

        Ok(CurrentDroplet {
            package_guid: package_guid.to_string(),
            created_at: droplet.created_at,
        })
    }

    async fn submit_build(&self, package_guid: &str) -> Result<Build, PlatformError> {
        let body = serde_json::to_value(BuildRequest::for_package(package_guid))
            .map_err(|e| PlatformError::decode("/v3/builds", e))?;
        self.call(Method::POST, "/v3/builds", Some(body)).await
    }

    async fn get_build(&self, build_guid: &str) -> Result<Build, PlatformError> {
        self.call(Method::GET, &format!("/v3/builds/{build_guid}"), None)
            .await
    }

    async fn assign_droplet(
        &self,
        app_guid: &str,
        droplet_guid: &str,
    ) -> Result<bool, PlatformError> {
        let path = format!("/v3/apps/{app_guid}/relationships/current_droplet");
        let body = serde_json::to_value(Relationship::to(droplet_guid))
            .map_err(|e| PlatformError::decode(&path, e))?;
        let echoed: Relationship = self.call(Method::PATCH, &path, Some(body)).await?;

        Ok(echoed.guid() == Some(droplet_guid))
    }

    async fn restart_application(&self, app_guid: &str) -> Result<(), PlatformError> {
        let path = format!("/v3/apps/{app_guid}/actions/restart");
        let _: Application = self.call(Method::POST, &path, None).await?;
        Ok(())
    }

    async fn get_application(&self, app_guid: &str) -> Result<Application, PlatformError> {
        self.call(Method::GET, &format!("/v3/apps/{app_guid}"), None)
            .await
    }
}

/// Convenience alias used by the orchestrators.
pub type SharedApi = std::sync::Arc<dyn PlatformApi>;
