#![allow(dead_code)]

// Shared fixtures for the integration tests
pub use lapps_chains::types::*;
pub use lapps_chains::{ChainExecutor, RemoteService};

use async_trait::async_trait;
use lif::ViewMetadata;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const VOCAB: &str = "http://vocab.lappsgrid.org/";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A service invocation as seen by the mock: who was called, with what.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub identifier: String,
    pub input: Document,
    pub output: Option<Document>,
}

/// Scripted stand-in for the service managers. Every successful invocation
/// appends one view, declaring `<VOCAB><short name>`, to the document.
#[derive(Default)]
pub struct MockRemoteService {
    invocations: Mutex<Vec<Invocation>>,
    failing: Option<String>,
    metadata: HashMap<String, Value>,
    listings: HashMap<String, Vec<Value>>,
    metadata_calls: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl MockRemoteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make invocations of `identifier` fail.
    pub fn failing_on(mut self, identifier: &str) -> Self {
        self.failing = Some(identifier.to_string());
        self
    }

    pub fn with_metadata(mut self, identifier: &str, metadata: Value) -> Self {
        self.metadata.insert(identifier.to_string(), metadata);
        self
    }

    pub fn with_listing(mut self, server: &str, records: Vec<Value>) -> Self {
        self.listings.insert(server.to_string(), records);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invoked_identifiers(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|i| i.identifier)
            .collect()
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteService for MockRemoteService {
    async fn invoke(
        &self,
        descriptor: &ServiceDescriptor,
        document: &Document,
    ) -> std::result::Result<Document, RemoteServiceError> {
        let mut invocation = Invocation {
            identifier: descriptor.identifier.clone(),
            input: document.clone(),
            output: None,
        };

        if self.failing.as_deref() == Some(descriptor.identifier.as_str()) {
            self.invocations.lock().unwrap().push(invocation);
            return Err(RemoteServiceError::new(
                &descriptor.identifier,
                RemoteFailure::Rejected("mock failure".to_string()),
            ));
        }

        let mut container = match &document.payload {
            Payload::Container(container) => container.clone(),
            Payload::Text(text) => Container::new(text.clone()),
        };
        container
            .views
            .push(marker_view(&format!("{}{}", VOCAB, descriptor.short_name())));
        let output = Document {
            discriminator: lif::LIF_DISCRIMINATOR.to_string(),
            payload: Payload::Container(container),
        };

        invocation.output = Some(output.clone());
        self.invocations.lock().unwrap().push(invocation);
        Ok(output)
    }

    async fn fetch_metadata(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> std::result::Result<Value, MetadataFetchError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .get(&descriptor.identifier)
            .cloned()
            .ok_or_else(|| MetadataFetchError {
                identifier: descriptor.identifier.clone(),
                cause: RemoteFailure::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                },
            })
    }

    async fn fetch_service_list(&self, server: &str) -> Result<Vec<Value>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        self.listings
            .get(server)
            .cloned()
            .ok_or_else(|| LappsError::General(format!("Unknown server: {}", server)))
    }
}

/// An empty view declaring a single annotation type.
pub fn marker_view(type_uri: &str) -> View {
    let mut contains = Map::new();
    contains.insert(type_uri.to_string(), json!({ "producer": "mock" }));
    View {
        id: None,
        metadata: ViewMetadata {
            contains,
            extra: Map::new(),
        },
        annotations: Vec::new(),
    }
}

/// A view holding `annotations`, declaring `<VOCAB><kind>` for each given kind.
pub fn view_of(kinds: &[&str], annotations: Vec<Annotation>) -> View {
    let mut view = marker_view(&format!("{}{}", VOCAB, kinds[0]));
    for kind in &kinds[1..] {
        view.metadata
            .contains
            .insert(format!("{}{}", VOCAB, kind), json!({}));
    }
    view.annotations = annotations;
    view
}

pub fn annotation(kind: &str) -> Annotation {
    Annotation::new(format!("{}{}", VOCAB, kind))
}

/// Whitespace tokens of `text` as `Token` annotations with a `word` feature.
pub fn tokens_of(text: &str) -> Vec<Annotation> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.chars().chain(std::iter::once(' ')).enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                let word: String = text.chars().skip(s).take(i - s).collect();
                tokens.push(
                    annotation("Token")
                        .with_span(s as i64, i as i64)
                        .with_feature("word", word),
                );
                start = None;
            }
            _ => {}
        }
    }
    tokens
}

pub fn lif_document(text: &str, views: Vec<View>) -> Document {
    let mut container = Container::new(text);
    container.views = views;
    Document {
        discriminator: lif::LIF_DISCRIMINATOR.to_string(),
        payload: Payload::Container(container),
    }
}

pub fn chain_of(identifier: &str, services: &[&str]) -> Chain {
    Chain {
        identifier: identifier.to_string(),
        services: services
            .iter()
            .map(|s| ServiceDescriptor::new(BRANDEIS, *s))
            .collect(),
    }
}

pub fn service_record(identifier: &str) -> Value {
    json!({
        "serviceId": identifier,
        "serviceName": identifier.rsplit(':').next().unwrap_or(identifier),
        "serviceType": "ProcessingService",
    })
}

pub fn producing(types: &[&str]) -> Value {
    json!({
        "discriminator": "http://vocab.lappsgrid.org/ns/meta",
        "payload": { "produces": { "annotations": types } }
    })
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP/1.1 server answering one canned response per connection,
/// in order, then shutting down.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                recorded.lock().unwrap().push(request);
                let reply = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    if status < 400 { "OK" } else { "Error" },
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{}/invoker/", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}
