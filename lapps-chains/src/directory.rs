use crate::traits::{MetadataCache, RemoteService};
use crate::types::{MetadataFetchError, Result, ServiceDescriptor, ServiceInfo, VASSAR};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drops services from a server's listing when their id contains any of the
/// given substrings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFilter {
    pub name: String,
    pub server: String,
    pub excluded_substrings: Vec<String>,
}

impl ServiceFilter {
    /// Vassar services the site has always hidden. The list is inherited,
    /// not derived from any documented incompatibility.
    pub fn vassar_exclusions() -> Self {
        Self {
            name: "vassar-exclusions".to_string(),
            server: VASSAR.to_string(),
            excluded_substrings: vec!["opennlp".to_string(), "gost".to_string()],
        }
    }

    pub fn excludes(&self, server: &str, identifier: &str) -> bool {
        self.server == server
            && self
                .excluded_substrings
                .iter()
                .any(|s| identifier.contains(s.as_str()))
    }
}

pub fn services_key(server: &str) -> String {
    format!("services/{}", server)
}

pub fn metadata_key(identifier: &str) -> String {
    format!("metadata/{}", identifier)
}

/// All services known on the configured service managers, indexed on their
/// service id.
pub struct ServiceDirectory {
    services: Vec<ServiceInfo>,
    index: HashMap<String, usize>,
    filters: Vec<ServiceFilter>,
    remote: Arc<dyn RemoteService>,
    cache: Arc<dyn MetadataCache>,
}

impl ServiceDirectory {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        cache: Arc<dyn MetadataCache>,
        filters: Vec<ServiceFilter>,
    ) -> Self {
        Self {
            services: Vec::new(),
            index: HashMap::new(),
            filters,
            remote,
            cache,
        }
    }

    /// Load the listings of `servers`, in order, using cached listings where
    /// available.
    pub async fn load(
        servers: &[String],
        remote: Arc<dyn RemoteService>,
        cache: Arc<dyn MetadataCache>,
        filters: Vec<ServiceFilter>,
    ) -> Result<Self> {
        info!("Loading LAPPS services...");
        let mut directory = Self::new(remote, cache, filters);
        for server in servers {
            let records = directory.service_records(server).await?;
            for record in records {
                directory.add_service(server, record);
            }
        }
        info!("Loaded {} services", directory.len());
        Ok(directory)
    }

    async fn service_records(&self, server: &str) -> Result<Vec<Value>> {
        let key = services_key(server);
        if let Some(Value::Array(records)) = self.cache.get(&key) {
            info!("Loading local cache with information for services on {}...", server);
            return Ok(records);
        }

        let records = self.remote.fetch_service_list(server).await?;
        if let Err(e) = self.cache.put(&key, &Value::Array(records.clone())) {
            warn!("Could not cache service list for {}: {}", server, e);
        }
        Ok(records)
    }

    /// Returns false when the record is skipped, either by a filter or
    /// because it has no service id.
    pub fn add_service(&mut self, server: &str, record: Value) -> bool {
        let Some(identifier) = record.get("serviceId").and_then(Value::as_str) else {
            warn!("Skipping service record without serviceId on {}", server);
            return false;
        };
        let identifier = identifier.to_string();

        if let Some(filter) = self.filters.iter().find(|f| f.excludes(server, &identifier)) {
            info!("Filter {} skips {}", filter.name, identifier);
            return false;
        }

        let metadata = self.cache.get(&metadata_key(&identifier));
        let position = self.services.len();
        self.services.push(ServiceInfo {
            server: server.to_string(),
            identifier: identifier.clone(),
            info: record,
            metadata,
        });
        self.index.insert(identifier, position);
        true
    }

    pub fn lookup(&self, identifier: &str) -> Option<&ServiceInfo> {
        self.index.get(identifier).map(|&i| &self.services[i])
    }

    pub fn list_all(&self, server: &str) -> Vec<&ServiceInfo> {
        self.services.iter().filter(|s| s.server == server).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceInfo> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Metadata for one service. Cached metadata is used unless `refresh` is
    /// set; a failed refresh still falls back to the cached copy.
    pub async fn metadata(
        &self,
        descriptor: &ServiceDescriptor,
        refresh: bool,
    ) -> std::result::Result<Value, MetadataFetchError> {
        let key = metadata_key(&descriptor.identifier);
        let cached = self.cache.get(&key);
        if !refresh {
            if let Some(metadata) = &cached {
                return Ok(metadata.clone());
            }
        }

        match self.remote.fetch_metadata(descriptor).await {
            Ok(metadata) => {
                if let Err(e) = self.cache.put(&key, &metadata) {
                    warn!("Could not cache metadata for {}: {}", descriptor.identifier, e);
                }
                Ok(metadata)
            }
            Err(e) => match cached {
                Some(metadata) => {
                    warn!("{}; using cached metadata", e);
                    Ok(metadata)
                }
                None => Err(e),
            },
        }
    }

    /// Fill in metadata for every service that does not have it yet. A
    /// service whose metadata cannot be had is kept, uncategorized.
    pub async fn load_all_metadata(&mut self) -> usize {
        let mut loaded = 0;
        for i in 0..self.services.len() {
            if self.services[i].metadata.is_some() {
                continue;
            }
            let descriptor = self.services[i].descriptor();
            match self.metadata(&descriptor, false).await {
                Ok(metadata) => {
                    self.services[i].metadata = Some(metadata);
                    loaded += 1;
                }
                Err(e) => error!("ERROR with {}: {}", descriptor.identifier, e),
            }
        }
        loaded
    }

    /// Services grouped on the (sorted) annotation types they produce.
    pub fn categorize(&self) -> BTreeMap<Vec<String>, Vec<&ServiceInfo>> {
        let mut categories: BTreeMap<Vec<String>, Vec<&ServiceInfo>> = BTreeMap::new();
        for service in &self.services {
            categories.entry(service.produces()).or_default().push(service);
        }
        categories
    }

    pub fn categorized_listing(&self) -> String {
        let mut listing = String::from("\n");
        for (output, mut services) in self.categorize() {
            if output.is_empty() {
                listing.push_str("None\n");
            } else {
                listing.push_str(&output.join("\n"));
                listing.push('\n');
            }
            services.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            for service in services {
                let _ = writeln!(listing, "    {}", service.identifier);
            }
            listing.push('\n');
        }
        listing
    }
}
