//! PostgREST RPC client.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{Error, Result, SupabaseConfig, TRACING_TARGET};

struct SupabaseClientInner {
    http: Client,
    rpc_base: Url,
    service_role_key: String,
}

/// Calls Postgres functions exposed through the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rpc_base", &self.inner.rpc_base.as_str())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Creates a client for the configured project.
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let base = format!("{}/rest/v1/rpc/", config.url.trim_end_matches('/'));
        let rpc_base =
            Url::parse(&base).map_err(|e| Error::Config(format!("invalid URL {base}: {e}")))?;

        if config.service_role_key.is_empty() {
            return Err(Error::Config("service role key is empty".to_owned()));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("pawtograder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            target: TRACING_TARGET,
            rpc_base = %rpc_base,
            "Supabase client created"
        );

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                rpc_base,
                service_role_key: config.service_role_key.clone(),
            }),
        })
    }

    /// Calls a function and decodes its JSON result.
    ///
    /// An empty body decodes as `null`.
    pub async fn rpc<A, T>(&self, function: &str, args: &A) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.call(function, args).await?;
        let body: &[u8] = if body.is_empty() { b"null" } else { &body };
        Ok(serde_json::from_slice(body)?)
    }

    /// Calls a function whose result is not needed.
    pub async fn rpc_void<A>(&self, function: &str, args: &A) -> Result<()>
    where
        A: Serialize + ?Sized,
    {
        self.call(function, args).await.map(|_| ())
    }

    async fn call<A>(&self, function: &str, args: &A) -> Result<Bytes>
    where
        A: Serialize + ?Sized,
    {
        let url = self
            .inner
            .rpc_base
            .join(function)
            .map_err(|e| Error::Config(format!("invalid function name {function}: {e}")))?;

        tracing::debug!(target: TRACING_TARGET, function = %function, "Calling RPC");

        let response = self
            .inner
            .http
            .post(url)
            .header("apikey", &self.inner.service_role_key)
            .bearer_auth(&self.inner.service_role_key)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&body).chars().take(512).collect();
            tracing::warn!(
                target: TRACING_TARGET,
                function = %function,
                status = %status,
                "RPC failed"
            );
            return Err(Error::Rpc {
                function: function.to_owned(),
                status,
                body,
            });
        }

        Ok(body)
    }
}
