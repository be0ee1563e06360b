use crate::credentials::Credentials;
use crate::traits::{CredentialStore, RemoteService};
use crate::types::{
    ClientConfig, Document, LappsError, MetadataFetchError, RemoteFailure, RemoteServiceError,
    Result, ServiceDescriptor,
};
use crate::utils::url::service_url;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Connection state for one server. The HTTP client is only built (and the
/// credentials only looked up) the first time a service on that server is
/// used.
enum Connection {
    Unconnected,
    Connected(Arc<ServerHandle>),
}

struct ServerHandle {
    client: Client,
    endpoint: String,
    credentials: Credentials,
}

pub struct LappsClient {
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    connections: RwLock<HashMap<String, Connection>>,
    listing_client: Client,
}

impl LappsClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let connections = config
            .servers
            .iter()
            .map(|server| (server.name.clone(), Connection::Unconnected))
            .collect();
        let listing_client = build_http_client(&config)?;

        Ok(Self {
            config,
            credentials,
            connections: RwLock::new(connections),
            listing_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle for `server`, connecting first if needed.
    async fn connection(&self, server: &str) -> std::result::Result<Arc<ServerHandle>, RemoteFailure> {
        {
            let connections = self.connections.read().await;
            match connections.get(server) {
                Some(Connection::Connected(handle)) => return Ok(handle.clone()),
                Some(Connection::Unconnected) => {}
                None => return Err(RemoteFailure::UnknownServer(server.to_string())),
            }
        }

        let mut connections = self.connections.write().await;
        // Another task may have connected while we waited for the write lock.
        if let Some(Connection::Connected(handle)) = connections.get(server) {
            return Ok(handle.clone());
        }

        let server_config = self
            .config
            .server(server)
            .ok_or_else(|| RemoteFailure::UnknownServer(server.to_string()))?;
        let credentials = self
            .credentials
            .credentials_for(server)
            .ok_or_else(|| RemoteFailure::MissingCredentials(server.to_string()))?;

        info!("Connecting to {} service manager at {}", server, server_config.endpoint);
        let handle = Arc::new(ServerHandle {
            client: build_http_client(&self.config)?,
            endpoint: server_config.endpoint.clone(),
            credentials,
        });
        connections.insert(server.to_string(), Connection::Connected(handle.clone()));
        Ok(handle)
    }

    async fn execute(&self, descriptor: &ServiceDescriptor, document: &Document) -> std::result::Result<Document, RemoteFailure> {
        let handle = self.connection(&descriptor.server).await?;
        let url = service_url(&handle.endpoint, &descriptor.identifier, None)?;
        let start_time = Instant::now();

        debug!("POST {} (discriminator={})", url, document.discriminator);
        let response = handle
            .client
            .post(url)
            .basic_auth(&handle.credentials.user, Some(&handle.credentials.password))
            .json(document)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            "{} answered {} in {}ms ({} bytes)",
            descriptor.identifier,
            status.as_u16(),
            start_time.elapsed().as_millis(),
            body.len()
        );

        if !status.is_success() {
            return Err(RemoteFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let output: Document = serde_json::from_str(&body)?;
        if output.is_error() {
            return Err(RemoteFailure::Rejected(output.text_value().to_string()));
        }
        Ok(output)
    }

    async fn metadata(&self, descriptor: &ServiceDescriptor) -> std::result::Result<Value, RemoteFailure> {
        let handle = self.connection(&descriptor.server).await?;
        let url = service_url(&handle.endpoint, &descriptor.identifier, Some("metadata"))?;

        info!("Retrieving metadata from {}", descriptor.identifier);
        let response = handle
            .client
            .get(url)
            .basic_auth(&handle.credentials.user, Some(&handle.credentials.password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RemoteFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        unwrap_metadata(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteService for LappsClient {
    async fn invoke(
        &self,
        descriptor: &ServiceDescriptor,
        document: &Document,
    ) -> std::result::Result<Document, RemoteServiceError> {
        self.execute(descriptor, document)
            .await
            .map_err(|cause| RemoteServiceError::new(&descriptor.identifier, cause))
    }

    async fn fetch_metadata(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> std::result::Result<Value, MetadataFetchError> {
        self.metadata(descriptor)
            .await
            .map_err(|cause| MetadataFetchError {
                identifier: descriptor.identifier.clone(),
                cause,
            })
    }

    async fn fetch_service_list(&self, server: &str) -> Result<Vec<Value>> {
        let server_config = self
            .config
            .server(server)
            .ok_or_else(|| LappsError::General(format!("Unknown server: {}", server)))?;

        info!("Pinging {} service manager for list of services...", server);
        let response = self.listing_client.get(&server_config.services_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Service listing for {} returned {}", server, status);
            return Err(LappsError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let listing: Value = response.json().await?;
        match listing.get("elements").and_then(Value::as_array) {
            Some(elements) => Ok(elements.clone()),
            None => Err(LappsError::General(format!(
                "Service listing for {} has no elements",
                server
            ))),
        }
    }
}

fn build_http_client(config: &ClientConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
}

/// Metadata arrives either as the JSON object itself, as a JSON string
/// holding it, or wrapped in a `_value_1` field by some SOAP bridges.
pub fn unwrap_metadata(value: Value) -> std::result::Result<Value, RemoteFailure> {
    match value {
        Value::String(embedded) => Ok(serde_json::from_str(&embedded)?),
        Value::Object(mut fields) => match fields.remove("_value_1") {
            Some(Value::String(embedded)) => Ok(serde_json::from_str(&embedded)?),
            Some(inner) => Ok(inner),
            None => Ok(Value::Object(fields)),
        },
        other => Ok(other),
    }
}
