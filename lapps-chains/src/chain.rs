use crate::traits::{RemoteService, StepSink};
use crate::types::{
    BypassMode, Chain, ChainConfig, ChainExecutionError, Document, Result, ServiceDescriptor,
    StepRecording,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Example output served in bypass mode when no file is configured.
pub const BUILTIN_EXAMPLE: &str = include_str!("../data/example.lif");

/// Runs the services of a chain one after the other, handing the output of
/// each step to the next. The first failing step aborts the run.
pub struct ChainExecutor {
    remote: Arc<dyn RemoteService>,
    sink: Option<Box<dyn StepSink>>,
    bypass: Option<Document>,
}

impl ChainExecutor {
    pub fn new(remote: Arc<dyn RemoteService>, config: &ChainConfig) -> Result<Self> {
        let sink: Option<Box<dyn StepSink>> = match &config.save_steps {
            StepRecording::Disabled => None,
            StepRecording::Directory(dir) => Some(Box::new(DirectorySink::new(dir.clone()))),
        };

        let bypass = match &config.bypass {
            BypassMode::Disabled => None,
            BypassMode::BuiltinExample => Some(serde_json::from_str(BUILTIN_EXAMPLE)?),
            BypassMode::ExampleFile(path) => {
                Some(serde_json::from_str(&fs::read_to_string(path)?)?)
            }
        };
        if bypass.is_some() {
            warn!("Chain processing is bypassed, remote services will not be called");
        }

        Ok(Self {
            remote,
            sink,
            bypass,
        })
    }

    /// Replace the configured step sink.
    pub fn with_sink(mut self, sink: Box<dyn StepSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass.is_some()
    }

    pub async fn run(&self, chain: &Chain, input: Document) -> std::result::Result<Document, ChainExecutionError> {
        if let Some(example) = &self.bypass {
            info!("Bypassing chain {}, returning example document", chain.identifier);
            return Ok(example.clone());
        }

        info!("Running chain {} ({} steps)", chain.identifier, chain.services.len());
        let mut document = input;
        for (index, service) in chain.services.iter().enumerate() {
            let step = index + 1;
            info!("service={}", service.identifier);

            document = self
                .remote
                .invoke(service, &document)
                .await
                .map_err(|cause| ChainExecutionError {
                    chain_id: chain.identifier.clone(),
                    step_index: step,
                    service_identifier: service.identifier.clone(),
                    cause,
                })?;

            info!("discriminator={}", document.discriminator);
            self.record_step(step, service, &document);
        }

        Ok(document)
    }

    fn record_step(&self, step: usize, service: &ServiceDescriptor, document: &Document) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(step, service, document) {
                warn!("Could not record output of step {} ({}): {}", step, service.identifier, e);
            }
        }
    }
}

/// Writes each step's output as `NN-<service short name>.lif` into a directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(step: usize, service: &ServiceDescriptor) -> String {
        format!("{:02}-{}.lif", step, service.short_name())
    }
}

impl StepSink for DirectorySink {
    fn record(&self, step: usize, service: &ServiceDescriptor, document: &Document) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(step, service));
        fs::write(&path, serde_json::to_string_pretty(document)?)?;
        debug!("Saved step {} output to {}", step, path.display());
        Ok(())
    }
}
