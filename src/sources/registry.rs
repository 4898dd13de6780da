//! DOI-to-journal resolution across registries and the doi.org fallback.

use std::sync::Arc;

use super::{
    classify_url, crossref::CrossRefSource, encode_doi, medra::MedraSource, DoiResolver,
    HandleLookup, MetadataRegistry, RegistryAnswer, SourceError, UrlClass,
};
use crate::config::Endpoints;
use crate::models::{LookupResult, RunTally};
use crate::utils::HttpClient;

/// Resolves DOIs to journal names.
///
/// Registries are tried in registration order. A registry that does not know
/// the DOI hands over to the next one; once all of them have missed, the
/// doi.org resolver decides between a preprint, a known unregistered journal,
/// an unrecognised URL and an invalid DOI.
#[derive(Debug, Clone)]
pub struct JournalResolver {
    registries: Vec<Arc<dyn MetadataRegistry>>,
    resolver: DoiResolver,
}

impl JournalResolver {
    /// Create a resolver with CrossRef and mEDRA at their public endpoints
    pub fn new(client: HttpClient) -> Self {
        Self::from_endpoints(client, &Endpoints::default())
    }

    /// Create a resolver with CrossRef and mEDRA at the configured endpoints
    pub fn from_endpoints(client: HttpClient, endpoints: &Endpoints) -> Self {
        let mut resolver = Self::with_resolver(DoiResolver::with_base_url(
            client.clone(),
            &endpoints.doi_resolver,
        ));

        resolver.register(Arc::new(CrossRefSource::with_base_url(
            client.clone(),
            &endpoints.crossref,
        )));
        resolver.register(Arc::new(MedraSource::with_base_url(client, &endpoints.medra)));

        resolver
    }

    /// Create a resolver with no registries
    pub fn with_resolver(resolver: DoiResolver) -> Self {
        Self {
            registries: Vec::new(),
            resolver,
        }
    }

    /// Append a registry to the lookup order
    pub fn register(&mut self, registry: Arc<dyn MetadataRegistry>) {
        self.registries.push(registry);
    }

    /// Registry IDs in lookup order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registries.iter().map(|r| r.id())
    }

    /// Resolve one DOI and fold the outcome into `tally`.
    ///
    /// Misses are absorbed; any other error aborts and leaves `tally` untouched.
    pub async fn resolve(
        &self,
        doi: &str,
        tally: &mut RunTally,
    ) -> Result<LookupResult, SourceError> {
        let result = self.lookup(doi).await?;
        tally.record(&result);
        Ok(result)
    }

    async fn lookup(&self, doi: &str) -> Result<LookupResult, SourceError> {
        let encoded = encode_doi(doi);

        for registry in &self.registries {
            match registry.lookup_journal(&encoded).await {
                Ok(RegistryAnswer::Journal(journal)) => {
                    tracing::debug!("{} lists {} in {}", registry.name(), doi, journal);
                    return Ok(LookupResult::Found { journal });
                }
                Ok(RegistryAnswer::NoContainerTitle) => {
                    // Counted as a preprint, but the row keeps an empty journal cell.
                    tracing::warn!(
                        "{} lists no container title for {}; counting it as a preprint",
                        registry.name(),
                        doi
                    );
                    return Ok(LookupResult::Preprint { server: None });
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("{} has no record of {}", registry.name(), doi);
                }
                Err(e) => return Err(e),
            }
        }

        let url = match self.resolver.resolve(&encoded).await? {
            HandleLookup::Missing => {
                tracing::debug!("doi.org does not know {}", doi);
                return Ok(LookupResult::Invalid {
                    doi: doi.to_string(),
                });
            }
            HandleLookup::Url(url) => url,
        };

        Ok(match classify_url(&url) {
            UrlClass::Preprint(server) => LookupResult::Preprint {
                server: Some(server),
            },
            UrlClass::KnownUnregistered(journal) => LookupResult::KnownUnregistered {
                journal: journal.to_string(),
            },
            UrlClass::Unknown => LookupResult::NotFound {
                doi: doi.to_string(),
                url,
            },
        })
    }
}
