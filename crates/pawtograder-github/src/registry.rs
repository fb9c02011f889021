//! Installation registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    Error, ErrorKind, GitHubApp, InstallationClient, RepositoryName, Result, TRACING_TARGET,
};

/// Installation clients of the App, keyed by account login.
///
/// Built once at startup and shared by cloning. Owner lookups are
/// case-insensitive. An unknown owner is an error; there is no fallback to an
/// arbitrary installation.
#[derive(Clone, Default)]
pub struct InstallationRegistry {
    by_owner: Arc<HashMap<String, InstallationClient>>,
}

impl InstallationRegistry {
    /// Enumerates every installation of the App and builds one client each.
    pub async fn discover(app: &GitHubApp) -> Result<Self> {
        let installations = app.list_installations().await?;
        let registry = Self::from_clients(
            installations
                .into_iter()
                .map(|installation| InstallationClient::new(app.clone(), installation)),
        );

        tracing::info!(
            target: TRACING_TARGET,
            app_id = app.app_id(),
            installations = registry.len(),
            "Installation registry initialized"
        );

        Ok(registry)
    }

    /// Builds a registry from existing clients.
    pub fn from_clients(clients: impl IntoIterator<Item = InstallationClient>) -> Self {
        let mut by_owner = HashMap::new();

        for client in clients {
            let owner = client.account_login().to_ascii_lowercase();
            if by_owner.contains_key(&owner) {
                tracing::warn!(
                    target: TRACING_TARGET,
                    owner = %owner,
                    installation_id = client.id(),
                    "Duplicate installation for account, keeping the first"
                );
            } else {
                by_owner.insert(owner, client);
            }
        }

        Self {
            by_owner: Arc::new(by_owner),
        }
    }

    /// Returns the client for an account login.
    pub fn for_owner(&self, owner: &str) -> Result<&InstallationClient> {
        self.by_owner
            .get(&owner.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("GitHub App is not installed on {owner}"))
            })
    }

    /// Returns the client for the owner of a repository.
    pub fn for_repository(&self, repository: &RepositoryName) -> Result<&InstallationClient> {
        self.for_owner(repository.owner())
    }

    /// Returns the lowercase logins of all known accounts.
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.by_owner.keys().map(String::as_str)
    }

    /// Returns the number of accounts with an installation.
    pub fn len(&self) -> usize {
        self.by_owner.len()
    }

    /// Returns `true` if the App has no installations.
    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

impl std::fmt::Debug for InstallationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationRegistry")
            .field("installations", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::app::tests::test_app;

    #[tokio::test]
    async fn discovers_installations_by_owner() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 11, "account": { "login": "Northeastern-CS", "type": "Organization" } },
                { "id": 12, "account": { "login": "pawtograder-org", "type": "Organization" } },
            ])))
            .mount(&server)
            .await;

        let registry = InstallationRegistry::discover(&test_app(&server))
            .await
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.for_owner("northeastern-cs").unwrap().id(), 11);
        assert_eq!(registry.for_owner("PAWTOGRADER-ORG").unwrap().id(), 12);
        let mut owners: Vec<_> = registry.owners().collect();
        owners.sort_unstable();
        assert_eq!(owners, ["northeastern-cs", "pawtograder-org"]);

        let repository: RepositoryName = "Northeastern-CS/hw1-solution".parse().unwrap();
        assert_eq!(registry.for_repository(&repository).unwrap().id(), 11);
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/app/installations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 11, "account": { "login": "pawtograder-org" } },
            ])))
            .mount(&server)
            .await;

        let registry = InstallationRegistry::discover(&test_app(&server))
            .await
            .unwrap();

        let error = registry.for_owner("someone-else").unwrap_err();
        assert!(error.is_not_found());
        assert!(error.to_string().contains("someone-else"));
    }

    #[test]
    fn empty_registry() {
        let registry = InstallationRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.for_owner("any").is_err());
    }
}
