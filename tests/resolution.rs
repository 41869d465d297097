//! End-to-end resolution tests: listing, classification, caching and
//! snapshots against the in-memory store.

mod common;

use common::{fixture_store, RSA_KEY};
use credsync::cache::ExpiringMemoizer;
use credsync::config::ProviderConfig;
use credsync::credentials::tags::USERNAME_TAG;
use credsync::credentials::{snapshot, Credential, CredentialKind, SnapshotRecord};
use credsync::pipeline::CredentialResolver;
use credsync::provider::CredentialsProvider;
use credsync::secrets::{
    InMemorySecretsStore, PaginatedLister, SecretLister, SecretSummary, SecretValue, SecretsStore,
};
use credsync::CredentialsError;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn no_endpoints(
    _: &credsync::config::EndpointConfig,
) -> credsync::Result<Arc<dyn SecretsStore>> {
    Err(CredentialsError::config("unexpected endpoint"))
}

#[tokio::test]
async fn test_pagination_completeness() {
    let store = InMemorySecretsStore::new().with_page_size(3);
    for i in 0..10 {
        store.insert(SecretSummary::new(format!("secret-{i:02}")), SecretValue::text("v"));
    }
    let store = Arc::new(store);

    let summaries = PaginatedLister::new(store.clone()).list().await.unwrap();
    assert_eq!(summaries.len(), 10);
    // Four pages of 3, 3, 3 and 1.
    assert_eq!(store.list_count(), 4);
}

#[tokio::test]
async fn test_listing_is_idempotent() {
    let store = fixture_store();
    let lister = PaginatedLister::new(store);

    let first: BTreeSet<String> = lister.list().await.unwrap().into_iter().map(|s| s.id).collect();
    let second: BTreeSet<String> = lister.list().await.unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_classification_roundtrip() {
    let store = Arc::new(InMemorySecretsStore::new());
    store.insert(SecretSummary::new("creds").with_tag(USERNAME_TAG, "joe"), SecretValue::text("hello"));

    let credentials = CredentialResolver::new(store.clone()).unwrap().resolve().await.unwrap();
    let Credential::UsernameSecret(c) = &credentials[0] else { panic!("expected legacy credential") };
    assert_eq!(c.username(), "joe");
    assert_eq!(c.password().await.unwrap().expose_secret(), "hello");
    assert_eq!(credentials[0].kind(), Some(CredentialKind::UsernamePassword));

    store.insert(SecretSummary::new("creds").with_tag(USERNAME_TAG, "joe"), SecretValue::text(RSA_KEY));

    let credentials = CredentialResolver::new(store).unwrap().resolve().await.unwrap();
    let Credential::UsernameSecret(c) = &credentials[0] else { panic!("expected legacy credential") };
    assert_eq!(c.username(), "joe");
    assert_eq!(c.private_keys().await.unwrap().len(), 1);
    assert!(c.passphrase().is_empty());
    assert_eq!(credentials[0].kind(), Some(CredentialKind::SshUserPrivateKey));
}

#[tokio::test]
async fn test_fixture_types() {
    let provider =
        CredentialsProvider::from_config(&ProviderConfig::default(), fixture_store(), no_endpoints).unwrap();

    let credentials = provider.list_all().await.unwrap();
    let ids: Vec<&str> = credentials.iter().map(Credential::id).collect();
    // "kerberos" has a type no factory owns.
    assert_eq!(ids, vec!["api-token", "db", "deploy-key", "keystore", "kubeconfig", "service"]);

    let Some(Credential::Json(service)) = provider.lookup_by_id("service").await.unwrap() else {
        panic!("expected json credential")
    };
    assert_eq!(service.field("client_id").await.unwrap().expose_secret(), "abc");

    let Some(Credential::File(kubeconfig)) = provider.lookup_by_id("kubeconfig").await.unwrap() else {
        panic!("expected file credential")
    };
    assert_eq!(kubeconfig.file_name(), "config.yaml");
    assert_eq!(kubeconfig.content().await.unwrap().expose_secret(), b"apiVersion: v1");
}

#[tokio::test]
async fn test_mismatch_is_field_scoped() {
    let provider =
        CredentialsProvider::from_config(&ProviderConfig::default(), fixture_store(), no_endpoints).unwrap();

    // Tagged as an SSH key but the payload is not PEM.
    let Some(Credential::SshUserPrivateKey(c)) = provider.lookup_by_id("deploy-key").await.unwrap() else {
        panic!("expected ssh credential")
    };
    assert_eq!(c.username(), "git");
    assert!(matches!(c.private_keys().await, Err(CredentialsError::Unavailable { .. })));

    // The rest of the collection is unaffected.
    assert_eq!(provider.list_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_dedup_later_entry_wins() {
    let store = Arc::new(InMemorySecretsStore::new().with_page_size(1));
    store.push_duplicate(SecretSummary::new("foo").with_description("old"), SecretValue::text("1"));
    store.push_duplicate(SecretSummary::new("foo").with_description("new"), SecretValue::text("2"));

    let credentials = CredentialResolver::new(store).unwrap().resolve().await.unwrap();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].description(), "new");
}

#[tokio::test]
async fn test_snapshot_isolation() {
    let store = Arc::new(InMemorySecretsStore::new());
    store.insert(SecretSummary::new("creds").with_tag(USERNAME_TAG, "joe"), SecretValue::text("hello"));

    let credentials = CredentialResolver::new(store.clone()).unwrap().resolve().await.unwrap();
    let snap = snapshot(&credentials[0]).await.unwrap();

    store.set_failing(true);
    let Credential::UsernameSecret(c) = &snap else { panic!("expected legacy credential") };
    assert_eq!(c.password().await.unwrap().expose_secret(), "hello");

    let record = SnapshotRecord::from_credential(&snap).await.unwrap();
    let json = serde_json::to_string(&record).unwrap();
    let restored: SnapshotRecord = serde_json::from_str(&json).unwrap();
    let Credential::UsernamePassword(c) = restored.into_credential().unwrap() else {
        panic!("expected username/password credential")
    };
    assert_eq!(c.username(), "joe");
    assert_eq!(c.password().await.unwrap().expose_secret(), "hello");
    assert_eq!(store.get_count("creds"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_runs_once() {
    let memo = Arc::new(ExpiringMemoizer::new(Duration::from_secs(60)).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let store = fixture_store();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let memo = memo.clone();
            let calls = calls.clone();
            let store = store.clone();
            tokio::spawn(async move {
                memo.get(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    CredentialResolver::new(store)?.resolve().await.map(Arc::new)
                })
                .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap().len(), 6);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_then_success() {
    let store = fixture_store();
    store.set_failing(true);
    let provider = CredentialsProvider::from_config(&ProviderConfig::default(), store.clone(), no_endpoints).unwrap();

    assert!(provider.list_all().await.unwrap_err().is_retrieval());

    store.set_failing(false);
    assert_eq!(provider.list_all().await.unwrap().len(), 6);
}
