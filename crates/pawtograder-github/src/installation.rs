//! Installation-scoped GitHub API client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::app::{send, send_json};
use crate::{GitHubApp, Installation, InstallationToken, RepositoryName, Result, TRACING_TARGET};

/// Installation tokens are refreshed this long before GitHub expires them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/repo` as reported by GitHub.
    pub full_name: String,
    /// Name of the default branch.
    pub default_branch: String,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
}

/// A git reference and the object it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    /// Fully qualified ref, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Target object.
    pub object: GitObject,
}

/// The object a [`GitRef`] points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitObject {
    /// Object SHA.
    pub sha: String,
    /// Object type, usually `commit`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// GitHub API client authenticated as one App installation.
///
/// The access token is minted on first use and transparently replaced five
/// minutes before it expires. Clones share the token cache.
#[derive(Clone)]
pub struct InstallationClient {
    app: GitHubApp,
    installation: Arc<Installation>,
    token: Arc<RwLock<Option<InstallationToken>>>,
}

impl InstallationClient {
    /// Creates a client for the given installation.
    pub fn new(app: GitHubApp, installation: Installation) -> Self {
        Self {
            app,
            installation: Arc::new(installation),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the installation id.
    pub fn id(&self) -> u64 {
        self.installation.id
    }

    /// Returns the login of the account the App is installed on.
    pub fn account_login(&self) -> &str {
        &self.installation.account.login
    }

    /// Returns a valid access token, minting a new one if needed.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref()
                && !token.expires_within(TOKEN_REFRESH_MARGIN)
            {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref()
            && !token.expires_within(TOKEN_REFRESH_MARGIN)
        {
            return Ok(token.token.clone());
        }

        tracing::debug!(
            target: TRACING_TARGET,
            installation_id = self.id(),
            account = %self.account_login(),
            "Refreshing installation access token"
        );

        let token = self.app.create_installation_token(self.id()).await?;
        let value = token.token.clone();
        *cached = Some(token);

        Ok(value)
    }

    async fn get(&self, path: &str) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(self.app.request(Method::GET, path).bearer_auth(token))
    }

    /// Fetches repository metadata.
    pub async fn get_repository(&self, repository: &RepositoryName) -> Result<Repository> {
        let path = format!("/repos/{}/{}", repository.owner(), repository.name());
        send_json(self.get(&path).await?, &path).await
    }

    /// Resolves `heads/{branch}` of a repository.
    pub async fn get_ref(&self, repository: &RepositoryName, branch: &str) -> Result<GitRef> {
        let path = format!(
            "/repos/{}/{}/git/ref/heads/{}",
            repository.owner(),
            repository.name(),
            branch
        );
        send_json(self.get(&path).await?, &path).await
    }

    /// Returns the commit SHA at the head of the default branch.
    pub async fn head_sha(&self, repository: &RepositoryName) -> Result<String> {
        let metadata = self.get_repository(repository).await?;
        let git_ref = self.get_ref(repository, &metadata.default_branch).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            repository = %repository,
            branch = %metadata.default_branch,
            sha = %git_ref.object.sha,
            "Resolved default branch head"
        );

        Ok(git_ref.object.sha)
    }

    /// Downloads the gzipped tarball of a repository at a commit.
    pub async fn download_tarball(&self, repository: &RepositoryName, sha: &str) -> Result<Bytes> {
        let path = format!(
            "/repos/{}/{}/tarball/{}",
            repository.owner(),
            repository.name(),
            sha
        );

        let data = send(self.get(&path).await?, &path).await?.bytes().await?;

        tracing::debug!(
            target: TRACING_TARGET,
            repository = %repository,
            sha = %sha,
            size = data.len(),
            "Downloaded repository tarball"
        );

        Ok(data)
    }
}

impl std::fmt::Debug for InstallationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationClient")
            .field("id", &self.installation.id)
            .field("account", &self.installation.account.login)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::app::tests::test_app;
    use crate::{Account, ErrorKind};

    fn client(server: &MockServer) -> InstallationClient {
        let installation = Installation {
            id: 7,
            account: Account {
                login: "pawtograder-org".to_owned(),
                kind: Some("Organization".to_owned()),
            },
        };
        InstallationClient::new(test_app(server), installation)
    }

    async fn mount_token(server: &MockServer, expires_at: &str, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/app/installations/7/access_tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "token": "ghs_installation",
                "expires_at": expires_at,
            })))
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mount_repository(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/pawtograder-org/grader"))
            .and(header("authorization", "Bearer ghs_installation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "full_name": "pawtograder-org/grader",
                "default_branch": "main",
                "private": true,
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/pawtograder-org/grader/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ref": "refs/heads/main",
                "object": { "sha": "3f2a9c", "type": "commit" },
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn resolves_default_branch_head() {
        let server = MockServer::start().await;
        mount_token(&server, "2099-01-01T00:00:00Z", 1).await;
        mount_repository(&server).await;

        let repository: RepositoryName = "pawtograder-org/grader".parse().unwrap();
        let sha = client(&server).head_sha(&repository).await.unwrap();

        assert_eq!(sha, "3f2a9c");
    }

    #[tokio::test]
    async fn refreshes_tokens_close_to_expiry() {
        let server = MockServer::start().await;
        mount_token(&server, "2000-01-01T00:00:00Z", 2).await;

        let client = client(&server);
        client.access_token().await.unwrap();
        client.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn missing_branch_is_an_upstream_failure() {
        let server = MockServer::start().await;
        mount_token(&server, "2099-01-01T00:00:00Z", 1).await;

        Mock::given(method("GET"))
            .and(path("/repos/pawtograder-org/grader/git/ref/heads/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Not Found",
            })))
            .mount(&server)
            .await;

        let repository: RepositoryName = "pawtograder-org/grader".parse().unwrap();
        let error = client(&server)
            .get_ref(&repository, "gone")
            .await
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::ExternalError);
    }

    #[tokio::test]
    async fn downloads_tarball_bytes() {
        let server = MockServer::start().await;
        mount_token(&server, "2099-01-01T00:00:00Z", 1).await;

        Mock::given(method("GET"))
            .and(path("/repos/pawtograder-org/grader/tarball/3f2a9c"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x1f\x8btarball".to_vec()))
            .mount(&server)
            .await;

        let repository: RepositoryName = "pawtograder-org/grader".parse().unwrap();
        let data = client(&server)
            .download_tarball(&repository, "3f2a9c")
            .await
            .unwrap();

        assert_eq!(&data[..], b"\x1f\x8btarball");
    }
}
