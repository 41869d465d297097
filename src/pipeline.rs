//! Credential resolution pipeline.
//!
//! One [`CredentialResolver::resolve`] call lists every secret, applies the
//! name and description transformations, classifies each summary and
//! collapses duplicate ids. A listing failure aborts the whole call; a secret
//! that no factory claims is dropped without affecting the others. Payloads
//! are never fetched here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::credentials::{Credential, FactoryRegistry, TaggedCredentialRequest};
use crate::errors::Result;
use crate::secrets::{
    DescriptionTransformation, NameTransformation, PaginatedLister, SecretLister, SecretsStore,
};

/// Lists, transforms, classifies and de-duplicates.
pub struct CredentialResolver {
    store: Arc<dyn SecretsStore>,
    lister: Box<dyn SecretLister>,
    registry: Arc<FactoryRegistry>,
    name_transformation: NameTransformation,
    description_transformation: DescriptionTransformation,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.store_name())
            .field("registry", &self.registry)
            .field("name_transformation", &self.name_transformation)
            .field("description_transformation", &self.description_transformation)
            .finish()
    }
}

impl CredentialResolver {
    /// Resolver over every page of `store` with the built-in factories.
    pub fn new(store: Arc<dyn SecretsStore>) -> Result<Self> {
        Ok(Self::with_factories(store, Arc::new(FactoryRegistry::builtin()?)))
    }

    /// Resolver over every page of `store` classifying with `registry`.
    pub fn with_factories(store: Arc<dyn SecretsStore>, registry: Arc<FactoryRegistry>) -> Self {
        Self {
            lister: Box::new(PaginatedLister::new(store.clone())),
            store,
            registry,
            name_transformation: NameTransformation::default(),
            description_transformation: DescriptionTransformation::default(),
        }
    }

    /// Replaces the listing strategy. Payloads are still fetched from the
    /// resolver's store.
    pub fn with_lister(mut self, lister: Box<dyn SecretLister>) -> Self {
        self.lister = lister;
        self
    }

    pub fn with_name_transformation(mut self, transformation: NameTransformation) -> Self {
        self.name_transformation = transformation;
        self
    }

    pub fn with_description_transformation(
        mut self,
        transformation: DescriptionTransformation,
    ) -> Self {
        self.description_transformation = transformation;
        self
    }

    pub fn store_name(&self) -> &str {
        self.store.store_name()
    }

    /// Runs one full resolution pass.
    pub async fn resolve(&self) -> Result<Vec<Credential>> {
        let summaries = self.lister.list().await?;
        let listed = summaries.len();

        let credentials = summaries.into_iter().filter_map(|summary| {
            let id = self.name_transformation.apply(&summary.id);
            if id.is_empty() {
                debug!(remote_id = %summary.id, "Name transformation left an empty id; skipping");
                return None;
            }

            let request = TaggedCredentialRequest::new(id, self.store.clone())
                .with_remote_id(summary.id)
                .with_description(self.description_transformation.apply(&summary.description))
                .with_tags(summary.tags);
            self.registry.classify(&request)
        });

        let credentials = dedup_by_id(credentials);
        debug!(
            store = %self.store.store_name(),
            listed = listed,
            resolved = credentials.len(),
            "Resolved credentials"
        );
        Ok(credentials)
    }
}

/// Collapses credentials sharing an id. The later credential wins and takes
/// the position of the first occurrence.
pub(crate) fn dedup_by_id<I>(credentials: I) -> Vec<Credential>
where
    I: IntoIterator<Item = Credential>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut result: Vec<Credential> = Vec::new();

    for credential in credentials {
        match positions.get(credential.id()) {
            Some(&index) => {
                debug!(id = %credential.id(), "Duplicate credential id; later entry wins");
                result[index] = credential;
            }
            None => {
                positions.insert(credential.id().to_string(), result.len());
                result.push(credential);
            }
        }
    }
    result
}
