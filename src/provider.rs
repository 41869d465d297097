//! Host-facing credential store.
//!
//! A [`CredentialsProvider`] holds one or more named [`CredentialSource`]s.
//! Each source is a resolver fronted by its own [`ExpiringMemoizer`]; the
//! provider serves the union of all sources, later sources winning on
//! duplicate ids. The store is read-only: mutations fail with
//! [`CredentialsError::ReadOnly`].

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::ExpiringMemoizer;
use crate::config::{EndpointConfig, ProviderConfig};
use crate::credentials::{Credential, FactoryRegistry};
use crate::errors::{CredentialsError, Result};
use crate::pipeline::{dedup_by_id, CredentialResolver};
use crate::secrets::{PaginatedLister, SecretLister, SecretsStore, TagFilteredLister};

/// Name of the source built from the primary store.
pub const PRIMARY_SOURCE: &str = "primary";

/// A resolver and its cache.
#[derive(Debug)]
pub struct CredentialSource {
    name: String,
    resolver: CredentialResolver,
    cache: ExpiringMemoizer<Arc<Vec<Credential>>>,
}

impl CredentialSource {
    pub fn new(name: impl Into<String>, resolver: CredentialResolver, ttl: Duration) -> Result<Self> {
        Ok(Self { name: name.into(), resolver, cache: ExpiringMemoizer::new(ttl)? })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached collection, refreshed when stale.
    ///
    /// When a refresh fails and an earlier collection exists, the earlier
    /// collection is served instead of the error.
    pub async fn credentials(&self) -> Result<Arc<Vec<Credential>>> {
        let refreshed = self.cache.get(|| async { self.resolver.resolve().await.map(Arc::new) }).await;

        match refreshed {
            Ok(credentials) => Ok(credentials),
            Err(e) => match self.cache.last_value().await {
                Some(stale) => {
                    warn!(
                        source = %self.name,
                        error = %e,
                        count = stale.len(),
                        "Refresh failed; serving previous credentials"
                    );
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    /// Forces the next read to re-resolve.
    pub async fn invalidate(&self) {
        self.cache.expire().await;
    }
}

/// Read-only credential store over one or more sources.
#[derive(Debug, Default)]
pub struct CredentialsProvider {
    sources: Vec<CredentialSource>,
}

impl CredentialsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source. Later sources win on duplicate ids.
    pub fn with_source(mut self, source: CredentialSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Builds a provider from configuration with the built-in factories.
    ///
    /// `primary` backs the primary source; `connect` opens the store for each
    /// configured endpoint.
    pub fn from_config<F>(config: &ProviderConfig, primary: Arc<dyn SecretsStore>, connect: F) -> Result<Self>
    where
        F: FnMut(&EndpointConfig) -> Result<Arc<dyn SecretsStore>>,
    {
        Self::from_config_with_registry(config, Arc::new(FactoryRegistry::builtin()?), primary, connect)
    }

    /// Like [`Self::from_config`], classifying every source with `registry`.
    pub fn from_config_with_registry<F>(
        config: &ProviderConfig,
        registry: Arc<FactoryRegistry>,
        primary: Arc<dyn SecretsStore>,
        mut connect: F,
    ) -> Result<Self>
    where
        F: FnMut(&EndpointConfig) -> Result<Arc<dyn SecretsStore>>,
    {
        config.validate()?;

        let mut provider = Self::new().with_source(CredentialSource::new(
            PRIMARY_SOURCE,
            resolver_for(config, primary, registry.clone())?,
            config.cache.ttl(),
        )?);

        for endpoint in &config.endpoints {
            let store = connect(endpoint)?;
            info!(
                endpoint = %endpoint.name,
                region = ?endpoint.region,
                store = %store.store_name(),
                "Adding credential source"
            );
            provider = provider.with_source(CredentialSource::new(
                &endpoint.name,
                resolver_for(config, store, registry.clone())?,
                config.cache.ttl(),
            )?);
        }

        Ok(provider)
    }

    pub fn sources(&self) -> &[CredentialSource] {
        &self.sources
    }

    /// Every known credential. Sources are refreshed concurrently.
    pub async fn list_all(&self) -> Result<Vec<Credential>> {
        let collections = try_join_all(self.sources.iter().map(CredentialSource::credentials)).await?;
        Ok(dedup_by_id(collections.iter().flat_map(|c| c.iter().cloned())))
    }

    pub async fn lookup_by_id(&self, id: &str) -> Result<Option<Credential>> {
        Ok(self.list_all().await?.into_iter().find(|c| c.id() == id))
    }

    /// Forces every source to re-resolve on the next read.
    pub async fn refresh(&self) {
        for source in &self.sources {
            source.invalidate().await;
        }
    }

    pub async fn add(&self, _credential: Credential) -> Result<()> {
        Err(CredentialsError::read_only("add"))
    }

    pub async fn update(&self, _id: &str, _credential: Credential) -> Result<()> {
        Err(CredentialsError::read_only("update"))
    }

    pub async fn remove(&self, _id: &str) -> Result<()> {
        Err(CredentialsError::read_only("remove"))
    }
}

fn resolver_for(
    config: &ProviderConfig,
    store: Arc<dyn SecretsStore>,
    registry: Arc<FactoryRegistry>,
) -> Result<CredentialResolver> {
    let paginated = PaginatedLister::new(store.clone())
        .with_filters(config.server_filters()?)
        .with_page_size(config.page_size);

    let lister: Box<dyn SecretLister> = match config.tag_filter() {
        Some(filter) => Box::new(TagFilteredLister::new(paginated, filter)),
        None => Box::new(paginated),
    };

    Ok(CredentialResolver::with_factories(store, registry)
        .with_lister(lister)
        .with_name_transformation(config.transformations.name.clone())
        .with_description_transformation(config.transformations.description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagFilterConfig;
    use crate::credentials::tags::TYPE_TAG;
    use crate::credentials::{CredentialFactory, StringCredential, TaggedCredentialRequest};
    use crate::secrets::{InMemorySecretsStore, SecretSummary, SecretValue};
    use tracing_test::traced_test;

    fn store(entries: &[(&str, &str)]) -> Arc<InMemorySecretsStore> {
        let store = InMemorySecretsStore::new();
        for (id, description) in entries {
            store.insert(SecretSummary::new(*id).with_description(*description), SecretValue::text("v"));
        }
        Arc::new(store)
    }

    fn no_endpoints(_: &EndpointConfig) -> Result<Arc<dyn SecretsStore>> {
        Err(CredentialsError::config("no endpoints expected"))
    }

    #[tokio::test]
    async fn test_list_all_is_cached() {
        let store = store(&[("a", ""), ("b", "")]);
        let provider =
            CredentialsProvider::from_config(&ProviderConfig::default(), store.clone(), no_endpoints).unwrap();

        assert_eq!(provider.list_all().await.unwrap().len(), 2);
        assert_eq!(provider.list_all().await.unwrap().len(), 2);
        assert_eq!(store.list_count(), 1);

        provider.refresh().await;
        provider.list_all().await.unwrap();
        assert_eq!(store.list_count(), 2);
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let provider =
            CredentialsProvider::from_config(&ProviderConfig::default(), store(&[("a", "")]), no_endpoints).unwrap();

        assert!(provider.lookup_by_id("a").await.unwrap().is_some());
        assert!(provider.lookup_by_id("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mutations_are_read_only() {
        let provider =
            CredentialsProvider::from_config(&ProviderConfig::default(), store(&[("a", "")]), no_endpoints).unwrap();
        let credential = provider.lookup_by_id("a").await.unwrap().unwrap();

        assert!(matches!(provider.add(credential.clone()).await, Err(CredentialsError::ReadOnly { .. })));
        assert!(matches!(provider.update("a", credential).await, Err(CredentialsError::ReadOnly { .. })));
        let err = provider.remove("a").await.unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn test_first_failure_propagates() {
        let store = store(&[("a", "")]);
        store.set_failing(true);
        let provider = CredentialsProvider::from_config(&ProviderConfig::default(), store, no_endpoints).unwrap();

        assert!(provider.list_all().await.unwrap_err().is_retrieval());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stale_served_on_refresh_failure() {
        let store = store(&[("a", "")]);
        let provider =
            CredentialsProvider::from_config(&ProviderConfig::default(), store.clone(), no_endpoints).unwrap();
        provider.list_all().await.unwrap();

        store.set_failing(true);
        provider.refresh().await;
        let credentials = provider.list_all().await.unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(store.list_count(), 2);
        assert!(logs_contain("serving previous credentials"));
    }

    #[tokio::test]
    async fn test_endpoints_union_later_wins() {
        let primary = store(&[("shared", "primary"), ("only-primary", "")]);
        let secondary = store(&[("shared", "secondary"), ("only-secondary", "")]);

        let mut config = ProviderConfig::default();
        config.endpoints.push(EndpointConfig { name: "eu".into(), region: Some("eu-west-1".into()), location: None });

        let provider = CredentialsProvider::from_config(&config, primary, |_| {
            Ok(secondary.clone() as Arc<dyn SecretsStore>)
        })
        .unwrap();
        assert_eq!(provider.sources().len(), 2);

        let credentials = provider.list_all().await.unwrap();
        let ids: Vec<&str> = credentials.iter().map(Credential::id).collect();
        assert_eq!(ids, vec!["shared", "only-primary", "only-secondary"]);
        assert_eq!(credentials[0].description(), "secondary");
    }

    #[tokio::test]
    async fn test_tag_filter_from_config() {
        let store = InMemorySecretsStore::new();
        store.insert(SecretSummary::new("a").with_tag("team", "infra"), SecretValue::text("v"));
        store.insert(SecretSummary::new("b"), SecretValue::text("v"));

        let mut config = ProviderConfig::default();
        config.tag_filter = Some(TagFilterConfig { key: "team".into(), value: "infra".into() });

        let provider = CredentialsProvider::from_config(&config, Arc::new(store), no_endpoints).unwrap();
        let credentials = provider.list_all().await.unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].id(), "a");
    }

    struct KerberosFactory;

    impl CredentialFactory for KerberosFactory {
        fn credential_type(&self) -> &str {
            "kerberos"
        }

        fn create(&self, request: &TaggedCredentialRequest) -> Option<Credential> {
            Some(Credential::String(StringCredential::new(request.info(), request.secret())))
        }
    }

    #[tokio::test]
    async fn test_custom_registry_claims_extra_type() {
        let store = InMemorySecretsStore::new();
        store.insert(SecretSummary::new("ticket").with_tag(TYPE_TAG, "kerberos"), SecretValue::text("tgt"));
        store.insert(SecretSummary::new("token"), SecretValue::text("v"));
        let store = Arc::new(store);

        let builtin = CredentialsProvider::from_config(&ProviderConfig::default(), store.clone(), no_endpoints)
            .unwrap();
        assert!(builtin.lookup_by_id("ticket").await.unwrap().is_none());

        let mut factories = FactoryRegistry::builtin_factories();
        factories.push(Arc::new(KerberosFactory));
        let registry = Arc::new(FactoryRegistry::with_factories(factories).unwrap());

        let provider = CredentialsProvider::from_config_with_registry(
            &ProviderConfig::default(),
            registry,
            store,
            no_endpoints,
        )
        .unwrap();
        let Some(Credential::String(ticket)) = provider.lookup_by_id("ticket").await.unwrap() else {
            panic!("expected string credential")
        };
        assert_eq!(ticket.secret().await.unwrap().expose_secret(), "tgt");
        assert_eq!(provider.list_all().await.unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ProviderConfig::default();
        config.cache.ttl_seconds = 0;
        assert!(CredentialsProvider::from_config(&config, store(&[]), no_endpoints).is_err());
    }
}
