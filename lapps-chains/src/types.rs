use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub use lif::{Annotation, Container, Document, Payload, View};

pub const BRANDEIS: &str = "brandeis";
pub const VASSAR: &str = "vassar";

/// One remote callable: the service manager it lives on plus its service id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub server: String,
    pub identifier: String,
}

impl ServiceDescriptor {
    pub fn new(server: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            identifier: identifier.into(),
        }
    }

    /// Identifier without its grid prefix, e.g. `stanfordnlp.tokenizer_2.0.4`.
    pub fn short_name(&self) -> &str {
        self.identifier.rsplit(':').next().unwrap_or(&self.identifier)
    }
}

/// A named, ordered sequence of services. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub identifier: String,
    pub services: Vec<ServiceDescriptor>,
}

/// A service as listed by a service manager, with its metadata once known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub server: String,
    pub identifier: String,
    pub info: Value,
    pub metadata: Option<Value>,
}

impl ServiceInfo {
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(&self.server, &self.identifier)
    }

    /// Sorted annotation types the service declares it produces.
    pub fn produces(&self) -> Vec<String> {
        let mut produces: Vec<String> = self
            .metadata
            .as_ref()
            .and_then(|m| m.pointer("/payload/produces/annotations"))
            .and_then(Value::as_array)
            .map(|types| {
                types
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        produces.sort();
        produces
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    /// Base URL the service identifier is appended to for `execute` and
    /// `metadata` calls.
    pub endpoint: String,
    /// Service manager listing for this server.
    pub services_url: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub servers: Vec<ServerConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "LAPPS-Chains/1.0".to_string(),
            timeout_seconds: 120,
            servers: vec![
                ServerConfig {
                    name: BRANDEIS.to_string(),
                    endpoint: "http://eldrad.cs-i.brandeis.edu:8080/service_manager/invoker/".to_string(),
                    services_url: "https://api.lappsgrid.org/services/brandeis".to_string(),
                },
                ServerConfig {
                    name: VASSAR.to_string(),
                    endpoint: "http://vassar.lappsgrid.org/invoker/".to_string(),
                    services_url: "https://api.lappsgrid.org/services/vassar".to_string(),
                },
            ],
        }
    }
}

impl ClientConfig {
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.name.clone()).collect()
    }
}

/// Whether the output of every chain step is written out for inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StepRecording {
    #[default]
    Disabled,
    Directory(PathBuf),
}

/// Bypass skips every remote call and answers with a fixed example document.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BypassMode {
    #[default]
    Disabled,
    BuiltinExample,
    ExampleFile(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    pub save_steps: StepRecording,
    pub bypass: BypassMode,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteFailure {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("service rejected the document: {0}")]
    Rejected(String),

    #[error("unknown server: {0}")]
    UnknownServer(String),

    #[error("no credentials for server {0}")]
    MissingCredentials(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, thiserror::Error)]
#[error("service {identifier} failed: {cause}")]
pub struct RemoteServiceError {
    pub identifier: String,
    #[source]
    pub cause: RemoteFailure,
}

impl RemoteServiceError {
    pub fn new(identifier: impl Into<String>, cause: impl Into<RemoteFailure>) -> Self {
        Self {
            identifier: identifier.into(),
            cause: cause.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("chain {chain_id} failed at step {step_index} ({service_identifier})")]
pub struct ChainExecutionError {
    pub chain_id: String,
    /// 1-based position of the failing service in the chain.
    pub step_index: usize,
    pub service_identifier: String,
    #[source]
    pub cause: RemoteServiceError,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown chain: {name}")]
pub struct UnknownChainError {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
#[error("could not fetch metadata for {identifier}: {cause}")]
pub struct MetadataFetchError {
    pub identifier: String,
    #[source]
    pub cause: RemoteFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum LappsError {
    #[error(transparent)]
    UnknownChain(#[from] UnknownChainError),

    #[error(transparent)]
    RemoteService(#[from] RemoteServiceError),

    #[error(transparent)]
    ChainExecution(#[from] ChainExecutionError),

    #[error(transparent)]
    MetadataFetch(#[from] MetadataFetchError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, LappsError>;
