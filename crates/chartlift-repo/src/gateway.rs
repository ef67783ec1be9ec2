//! KubeSphere app store upload gateway
//!
//! The first version of a chart is posted to `.../v2/apps`, which creates the
//! application and answers with its name. Every further version is posted to
//! `.../v2/apps/{name}/versions`.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::credentials::ResolvedCredentials;
use crate::error::{RepoError, Result};
use crate::http::{build_client, normalize_base_url};

/// Path prefix of the application API on the KubeSphere gateway
const APPS_API: &str = "kapis/application.kubesphere.io/v2/apps";

/// Body of both upload calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub repo_name: String,
    /// Base64-encoded chart archive
    pub package: String,
    pub category_name: String,
    pub workspace: String,
    pub app_type: String,
}

impl UploadRequest {
    /// Wrap a chart archive, tagged with the import marker category
    pub fn helm(package: &[u8], marker: &str) -> Self {
        Self {
            repo_name: "upload".to_string(),
            package: base64::engine::general_purpose::STANDARD.encode(package),
            category_name: marker.to_string(),
            workspace: String::new(),
            app_type: "helm".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    app_name: String,
}

/// Upload target for chart packages
#[async_trait]
pub trait AppGateway: Send + Sync {
    /// Create an application from its first version, returning its identifier
    async fn create_app(&self, request: &UploadRequest) -> Result<String>;

    /// Attach a version to an existing application
    async fn create_version(&self, app_id: &str, request: &UploadRequest) -> Result<String>;
}

/// HTTP client for the KubeSphere application API
pub struct AppStoreGateway {
    server: String,
    client: reqwest::Client,
    credentials: ResolvedCredentials,
}

impl AppStoreGateway {
    pub fn new(server: &str, credentials: ResolvedCredentials) -> Result<Self> {
        Ok(Self {
            server: normalize_base_url(server)?,
            client: build_client()?,
            credentials,
        })
    }

    /// Endpoint creating an application
    pub fn apps_url(&self) -> String {
        format!("{}/{}", self.server, APPS_API)
    }

    /// Endpoint attaching a version to `app_id`
    pub fn versions_url(&self, app_id: &str) -> String {
        format!("{}/{}/{}/versions", self.server, APPS_API, app_id)
    }

    async fn post(&self, url: &str, request: &UploadRequest) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", self.credentials.auth_header())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RepoError::AppStoreNotFound {
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;

        if status != reqwest::StatusCode::OK {
            return Err(RepoError::UploadRejected {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| RepoError::InvalidResponse {
                message: e.to_string(),
            })?;
        Ok(parsed.app_name)
    }
}

#[async_trait]
impl AppGateway for AppStoreGateway {
    async fn create_app(&self, request: &UploadRequest) -> Result<String> {
        self.post(&self.apps_url(), request).await
    }

    async fn create_version(&self, app_id: &str, request: &UploadRequest) -> Result<String> {
        self.post(&self.versions_url(app_id), request).await
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bearer() -> ResolvedCredentials {
        Credentials::bearer("secret-token").resolve().unwrap()
    }

    #[test]
    fn test_upload_request_shape() {
        let request = UploadRequest::helm(b"chart", "openpitrix-import");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "repoName": "upload",
                "package": "Y2hhcnQ=",
                "categoryName": "openpitrix-import",
                "workspace": "",
                "appType": "helm"
            })
        );
    }

    #[test]
    fn test_urls() {
        let gateway = AppStoreGateway::new("http://ks-apiserver/", bearer()).unwrap();
        assert_eq!(
            gateway.apps_url(),
            "http://ks-apiserver/kapis/application.kubesphere.io/v2/apps"
        );
        assert_eq!(
            gateway.versions_url("nginx-x8k2"),
            "http://ks-apiserver/kapis/application.kubesphere.io/v2/apps/nginx-x8k2/versions"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[tokio::test]
    async fn test_create_app_returns_app_name() {
        let server = MockServer::start().await;
        let request = UploadRequest::helm(b"chart", "openpitrix-import");

        Mock::given(method("POST"))
            .and(path("/kapis/application.kubesphere.io/v2/apps"))
            .and(header("Authorization", "Bearer secret-token"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(&request))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"appName": "nginx-7f6"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = AppStoreGateway::new(&server.uri(), bearer()).unwrap();
        let app_id = gateway.create_app(&request).await.unwrap();
        assert_eq!(app_id, "nginx-7f6");
    }

    #[tokio::test]
    async fn test_create_version_uses_app_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/kapis/application.kubesphere.io/v2/apps/nginx-7f6/versions"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"appName": "nginx-7f6"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::basic("user", "pass").resolve().unwrap();
        let gateway = AppStoreGateway::new(&server.uri(), creds).unwrap();
        let request = UploadRequest::helm(b"chart", "openpitrix-import");
        gateway.create_version("nginx-7f6", &request).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gateway = AppStoreGateway::new(&server.uri(), bearer()).unwrap();
        let err = gateway
            .create_app(&UploadRequest::helm(b"x", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::AppStoreNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_other_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("app already exists"))
            .mount(&server)
            .await;

        let gateway = AppStoreGateway::new(&server.uri(), bearer()).unwrap();
        let err = gateway
            .create_app(&UploadRequest::helm(b"x", "m"))
            .await
            .unwrap_err();
        match err {
            RepoError::UploadRejected { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "app already exists");
            }
            other => panic!("Expected UploadRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let gateway = AppStoreGateway::new(&server.uri(), bearer()).unwrap();
        let err = gateway
            .create_app(&UploadRequest::helm(b"x", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidResponse { .. }));
        assert!(!err.is_fatal());
    }
}
