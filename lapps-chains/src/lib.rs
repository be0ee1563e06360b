pub mod types;
pub mod traits;
pub mod credentials;
pub mod cache;
pub mod client;
pub mod chain;
pub mod registry;
pub mod directory;
pub mod visualization;
pub mod page;
pub mod utils;

pub use types::*;
pub use traits::{CredentialStore, MetadataCache, RemoteService, StepSink};
pub use credentials::{Credentials, EnvCredentials, StaticCredentials};
pub use cache::{DirectoryCache, MemoryCache};
pub use client::LappsClient;
pub use chain::{ChainExecutor, DirectorySink};
pub use registry::ChainRegistry;
pub use directory::{ServiceDirectory, ServiceFilter};
pub use visualization::{visualize, Visualization};
pub use page::{render_document, RenderedDocument};
