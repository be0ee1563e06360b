use crate::types::{Chain, ServiceDescriptor, UnknownChainError, BRANDEIS};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::info;

const STANFORD_TOKENIZER: &str = "brandeis_eldrad_grid_1:stanfordnlp.tokenizer_2.0.4";
const STANFORD_SPLITTER: &str = "brandeis_eldrad_grid_1:stanfordnlp.splitter_2.0.4";
const STANFORD_TAGGER: &str = "brandeis_eldrad_grid_1:stanfordnlp.postagger_2.0.4";
const STANFORD_NER: &str = "brandeis_eldrad_grid_1:stanfordnlp.namedentityrecognizer_2.0.4";
const STANFORD_PARSER: &str = "brandeis_eldrad_grid_1:stanfordnlp.parser_2.0.4";

/// Chains known to the site: chain name -> (server, service id) steps.
pub const BUILTIN_CHAINS: &[(&str, &[(&str, &str)])] = &[
    (
        "stanford-tok-pos",
        &[(BRANDEIS, STANFORD_TOKENIZER), (BRANDEIS, STANFORD_TAGGER)],
    ),
    (
        "stanford-tok-pos-par",
        &[
            (BRANDEIS, STANFORD_TOKENIZER),
            (BRANDEIS, STANFORD_TAGGER),
            (BRANDEIS, STANFORD_PARSER),
        ],
    ),
    (
        "stanford-tok-pos-sen-ner-par",
        &[
            (BRANDEIS, STANFORD_TOKENIZER),
            (BRANDEIS, STANFORD_SPLITTER),
            (BRANDEIS, STANFORD_TAGGER),
            (BRANDEIS, STANFORD_NER),
            (BRANDEIS, STANFORD_PARSER),
        ],
    ),
];

/// Read-only table of chains, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Chain>,
}

impl ChainRegistry {
    pub fn from_table(table: &[(&str, &[(&str, &str)])]) -> Self {
        let chains = table
            .iter()
            .map(|(identifier, steps)| {
                let services = steps
                    .iter()
                    .map(|(server, service)| ServiceDescriptor::new(*server, *service))
                    .collect();
                (
                    identifier.to_string(),
                    Chain {
                        identifier: identifier.to_string(),
                        services,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        info!("Registered {} service chains", chains.len());
        Self { chains }
    }

    pub fn builtin() -> Self {
        Self::from_table(BUILTIN_CHAINS)
    }

    pub fn resolve(&self, name: &str) -> Option<&Chain> {
        self.chains.get(name)
    }

    /// Like `resolve`, for callers that report an unknown name to the user.
    pub fn require(&self, name: &str) -> Result<&Chain, UnknownChainError> {
        self.resolve(name).ok_or_else(|| UnknownChainError {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.chains.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Chain names, each followed by its indented service identifiers.
    pub fn describe(&self) -> String {
        let mut listing = String::new();
        for chain in self.chains.values() {
            let _ = writeln!(listing, "{}", chain.identifier);
            for service in &chain.services {
                let _ = writeln!(listing, "    {}", service.identifier);
            }
            listing.push('\n');
        }
        listing
    }
}
