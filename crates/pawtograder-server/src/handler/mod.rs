//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod discord;
mod error;
mod graders;
mod monitors;
mod response;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::{ErrorResponse, Grader, MonitorStatus, Received};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
///
/// Authentication is per route: the grader route requires an Actions ID
/// token and the Discord routes require a valid request signature.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(monitors::routes())
        .merge(graders::routes())
        .merge(discord::routes())
        .fallback(handler)
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Router;
    use axum::body::Bytes;
    use axum_test::TestServer;
    use ed25519_dalek::{Signer, SigningKey};
    use jiff::Timestamp;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use pawtograder_discord::{DiscordVerifier, RoleSyncQueue, RoleSyncRequest, RoleSyncService};
    use pawtograder_github::{
        Account, ArtifactStore, GitHubApp, GitHubConfig, GraderArtifactCache,
        GraderRepositoryLookup, Installation, InstallationClient, InstallationRegistry,
        OidcConfig, OidcVerifier, RepositoryName,
    };
    use pawtograder_opendal::SignedUrl;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::handler::routes;
    use crate::service::ServiceState;

    pub const TEST_PRIVATE_KEY: &str = include_str!("../testdata/signing-key.pem");
    pub const TEST_JWKS: &str = include_str!("../testdata/jwks.json");

    pub const STUDENT_REPOSITORY: &str = "pawtograder-org/hw1-alice";
    pub const GRADER_REPOSITORY: &str = "pawtograder-org/grader";
    pub const TRUSTED_WORKFLOW_REF: &str =
        "pawtograder-org/hw1-alice/.github/workflows/grade.yml@refs/heads/main";

    /// Object store that signs fake URLs for the keys it holds.
    #[derive(Default)]
    pub struct MemoryStore {
        objects: Mutex<HashMap<String, Bytes>>,
        uploads: AtomicUsize,
    }

    impl MemoryStore {
        pub fn uploads(&self) -> usize {
            self.uploads.load(Ordering::SeqCst)
        }

        pub fn object(&self, key: &str) -> Option<Bytes> {
            self.objects.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait::async_trait]
    impl ArtifactStore for MemoryStore {
        async fn signed_url(
            &self,
            key: &str,
            ttl: Duration,
        ) -> pawtograder_github::Result<Option<SignedUrl>> {
            let exists = self.objects.lock().unwrap().contains_key(key);
            Ok(exists.then(|| SignedUrl {
                url: format!("https://storage.test/graders/{key}?X-Amz-Signature=test"),
                expires_in: ttl,
            }))
        }

        async fn upload(&self, key: &str, data: Bytes) -> pawtograder_github::Result<()> {
            self.objects.lock().unwrap().insert(key.to_owned(), data);
            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StaticLookup(HashMap<String, RepositoryName>);

    #[async_trait::async_trait]
    impl GraderRepositoryLookup for StaticLookup {
        async fn grader_repository(
            &self,
            repository: &RepositoryName,
        ) -> pawtograder_github::Result<Option<RepositoryName>> {
            Ok(self.0.get(&repository.to_string()).cloned())
        }
    }

    /// Role sync queue that records every request.
    #[derive(Default, Clone)]
    pub struct RecordingQueue {
        requests: Arc<Mutex<Vec<RoleSyncRequest>>>,
    }

    impl RecordingQueue {
        pub fn requests(&self) -> Vec<RoleSyncRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RoleSyncQueue for RecordingQueue {
        async fn enqueue(&self, request: &RoleSyncRequest) -> pawtograder_discord::Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn discord_signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    /// Service state backed by a mock GitHub, in-memory storage and queues.
    ///
    /// The mock server doubles as the OIDC issuer. One installation (id 7)
    /// exists for `pawtograder-org`, and [`STUDENT_REPOSITORY`] maps to
    /// [`GRADER_REPOSITORY`].
    pub struct TestContext {
        pub github: MockServer,
        pub store: Arc<MemoryStore>,
        pub queue: RecordingQueue,
        pub state: ServiceState,
    }

    impl TestContext {
        pub async fn new() -> Self {
            let github = MockServer::start().await;

            let jwks: serde_json::Value = serde_json::from_str(TEST_JWKS).unwrap();
            Mock::given(method("GET"))
                .and(path("/.well-known/jwks"))
                .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
                .mount(&github)
                .await;

            let config = GitHubConfig::new(1234, TEST_PRIVATE_KEY).with_api_url(github.uri());
            let app = GitHubApp::new(&config).unwrap();
            let installation = Installation {
                id: 7,
                account: Account {
                    login: "pawtograder-org".to_owned(),
                    kind: Some("Organization".to_owned()),
                },
            };
            let installations =
                InstallationRegistry::from_clients([InstallationClient::new(app, installation)]);

            let lookup = StaticLookup(HashMap::from([(
                STUDENT_REPOSITORY.to_owned(),
                GRADER_REPOSITORY.parse().unwrap(),
            )]));

            let store = Arc::new(MemoryStore::default());
            let queue = RecordingQueue::default();

            let state = ServiceState::new(
                installations,
                Arc::new(lookup),
                GraderArtifactCache::from_arc(store.clone()),
                RoleSyncService::new(queue.clone()),
                OidcVerifier::new(OidcConfig::new(github.uri())).unwrap(),
                DiscordVerifier::new(discord_signing_key().verifying_key()),
            );

            Self {
                github,
                store,
                queue,
                state,
            }
        }

        /// Returns a [`TestServer`] serving all routes.
        pub fn server(&self) -> anyhow::Result<TestServer> {
            create_test_server_with_state(routes(), self.state.clone())
        }

        /// Mints an Actions ID token signed by the mock issuer.
        pub fn actions_token(&self, repository: &str, workflow_ref: Option<&str>) -> String {
            let now = Timestamp::now().as_second();
            let mut claims = json!({
                "iss": self.github.uri(),
                "sub": format!("repo:{repository}:ref:refs/heads/main"),
                "aud": "pawtograder",
                "iat": now,
                "nbf": now - 5,
                "exp": now + 300,
                "repository": repository,
                "ref": "refs/heads/main",
                "run_id": "1234567",
                "actor": "alice",
            });
            if let Some(workflow_ref) = workflow_ref {
                claims["workflow_ref"] = json!(workflow_ref);
            }

            let mut header = Header::new(Algorithm::RS256);
            header.kid = Some("test-key-1".to_owned());
            let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
            encode(&header, &claims, &key).unwrap()
        }

        /// Signs `timestamp || body` the way Discord does and returns the hex signature.
        pub fn sign_discord(timestamp: &str, body: &str) -> String {
            let message = [timestamp.as_bytes(), body.as_bytes()].concat();
            hex::encode(discord_signing_key().sign(&message).to_bytes())
        }
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub fn create_test_server_with_state(
        router: Router<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app = router.with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() -> anyhow::Result<()> {
        let context = TestContext::new().await;
        let server = context.server()?;

        let response = server.get("/api/unknown").await;

        response.assert_status_not_found();
        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "not_found");
        Ok(())
    }
}
