//! reqwest-backed dockman client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DockmanError, DockmanResult};
use crate::pagination::collect_pages;
use crate::traits::DockmanApi;
use crate::types::{Namespace, Network, PageMeta, Pod, ReplicationController, Tenant};

/// Redirect hops followed before a request is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// Build the API base URL for a management address.
#[must_use]
pub fn api_url(address: &str) -> String {
    format!("https://{}/api/dockman", address.trim_end_matches('/'))
}

/// Basic-auth credentials.
#[derive(Debug)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Connection settings for [`HttpDockman`].
#[derive(Debug)]
pub struct HttpConfig {
    /// API base URL, e.g. `https://10.0.0.1/api/dockman`.
    pub base_url: String,
    /// Sent with every request when present.
    pub credentials: Option<Credentials>,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Skip TLS certificate verification. Appliances serve self-signed
    /// certificates.
    pub accept_invalid_certs: bool,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            timeout: None,
            accept_invalid_certs: true,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Only `meta` is read from the unpaged probe request.
#[derive(Deserialize)]
struct CollectionEnvelope {
    meta: PageMeta,
}

#[derive(Deserialize)]
struct PageData<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Dockman API over HTTPS.
#[derive(Debug)]
pub struct HttpDockman {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpDockman {
    /// Create a client from configuration.
    pub fn new(config: HttpConfig) -> DockmanResult<Self> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(DockmanError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials: config.credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&[u8]>,
    ) -> RequestBuilder {
        debug!(%method, %url, "dockman request");

        let mut builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .query(query);
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.user, Some(creds.password.expose_secret())),
            None => builder,
        }
    }

    /// Send a request and return the response body, mapping error statuses.
    ///
    /// Redirects are followed here rather than by reqwest so that a POST
    /// or DELETE is re-sent with the same method and body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&[u8]>,
    ) -> DockmanResult<String> {
        let mut url = format!("{}/{}", self.base_url, path);
        let mut query = query;

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .request(method.clone(), &url, query, body)
                .send()
                .await?;
            let status = response.status();
            let response_url = response.url().clone();

            if status.is_redirection() {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| response_url.join(location).ok());
                if let Some(next) = next {
                    debug!(%method, from = %response_url, to = %next, "following redirect");
                    url = next.to_string();
                    query = &[];
                    continue;
                }
            }

            return match status {
                StatusCode::UNAUTHORIZED => Err(DockmanError::Unauthorized),
                StatusCode::FORBIDDEN => Err(DockmanError::Forbidden),
                s if s.is_success() => Ok(response.text().await?),
                s => {
                    let body = response.text().await.unwrap_or_default();
                    debug!(status = s.as_u16(), url = %response_url, "dockman request failed");
                    Err(DockmanError::status(s.as_u16(), response_url.to_string(), body))
                }
            };
        }

        Err(DockmanError::TooManyRedirects { url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> DockmanResult<T> {
        let body = self.send(Method::GET, path, query, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> DockmanResult<()> {
        let body = serde_json::to_vec(body)?;
        self.send(Method::POST, path, &[], Some(&body)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> DockmanResult<()> {
        self.send(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    /// Fetch every item of a collection endpoint.
    ///
    /// A probe request reads `meta.count`, then each page is requested by
    /// index. An empty probe body means an empty collection.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: Option<&str>,
    ) -> DockmanResult<Vec<T>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filters) = filters {
            query.push(("filters", filters.to_owned()));
        }

        let body = self.send(Method::GET, path, &query, None).await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let envelope: CollectionEnvelope = serde_json::from_str(&body)?;

        collect_pages(envelope.meta.count, |page| {
            let mut page_query = query.clone();
            page_query.push(("page", page.to_string()));
            async move {
                let page: PageData<T> = self.get_json(path, &page_query).await?;
                Ok(page.data)
            }
        })
        .await
    }
}

#[async_trait]
impl DockmanApi for HttpDockman {
    async fn list_tenants(&self) -> DockmanResult<Vec<Tenant>> {
        self.get_all("tenant", None).await
    }

    async fn get_tenant(&self, ns: &str) -> DockmanResult<Tenant> {
        self.get_json(&format!("tenant/{ns}"), &[]).await
    }

    async fn create_tenant(&self, tenant: &Tenant) -> DockmanResult<()> {
        self.post_json("tenant", tenant).await
    }

    async fn delete_tenant(&self, ns: &str) -> DockmanResult<()> {
        self.delete(&format!("tenant/{ns}")).await
    }

    async fn list_namespaces(&self) -> DockmanResult<Vec<Namespace>> {
        self.get_all("ns", None).await
    }

    async fn get_namespace(&self, ns: &str) -> DockmanResult<Namespace> {
        self.get_json(&format!("ns/{ns}"), &[]).await
    }

    async fn list_networks(&self) -> DockmanResult<Vec<Network>> {
        self.get_all("network", None).await
    }

    async fn list_pods(&self, ns: &str, filters: Option<&str>) -> DockmanResult<Vec<Pod>> {
        self.get_all(&format!("ns/{ns}/pods"), filters).await
    }

    async fn delete_pod(&self, ns: &str, name: &str) -> DockmanResult<()> {
        self.delete(&format!("ns/{ns}/pods/{name}")).await
    }

    async fn create_replication_controller(
        &self,
        ns: &str,
        rc: &ReplicationController,
    ) -> DockmanResult<()> {
        self.post_json(&format!("ns/{ns}/replicationcontrollers"), rc)
            .await
    }

    async fn delete_replication_controller(&self, ns: &str, name: &str) -> DockmanResult<()> {
        self.delete(&format!("ns/{ns}/replicationcontrollers/{name}"))
            .await
    }
}
