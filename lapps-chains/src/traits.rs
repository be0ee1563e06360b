use crate::credentials::Credentials;
use crate::types::{
    Document, MetadataFetchError, RemoteServiceError, Result, ServiceDescriptor,
};
use async_trait::async_trait;
use serde_json::Value;

/// Trait for reaching the LAPPS service managers (HTTP in production, mocks in tests)
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Run one service on a document and return the document it produces
    async fn invoke(
        &self,
        descriptor: &ServiceDescriptor,
        document: &Document,
    ) -> std::result::Result<Document, RemoteServiceError>;

    /// Ask a service to describe itself (produced types, parameters, ...)
    async fn fetch_metadata(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> std::result::Result<Value, MetadataFetchError>;

    /// Raw service records registered on a server's service manager
    async fn fetch_service_list(&self, server: &str) -> Result<Vec<Value>>;
}

/// Per-server basic-auth credentials
pub trait CredentialStore: Send + Sync {
    fn credentials_for(&self, server: &str) -> Option<Credentials>;
}

/// Key-value store for service listings and service metadata
pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&self, key: &str, value: &Value) -> Result<()>;
}

/// Receives the output of every chain step when step recording is on
pub trait StepSink: Send + Sync {
    fn record(&self, step: usize, descriptor: &ServiceDescriptor, document: &Document) -> Result<()>;
}
