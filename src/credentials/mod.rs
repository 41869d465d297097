//! Credential classification.
//!
//! Turns secret summaries into typed [`Credential`]s:
//!
//! - [`tags`]: reserved `credsync:` tag keys and the [`Tags`] map
//! - [`pem`]: PEM private-key framing checks
//! - [`lazy`]: the fetch-once payload cell behind every credential
//! - [`types`]: credential variants and their accessors
//! - [`factory`]: the type tag to factory registry
//! - [`snapshot`]: detached copies and their serialisable records

pub mod factory;
pub mod lazy;
pub mod pem;
pub mod snapshot;
pub mod tags;
pub mod types;

pub use factory::{
    CredentialFactory, DefaultFactory, FactoryRegistry, TaggedCredentialRequest, TypedFactory,
};
pub use lazy::LazySecret;
pub use snapshot::{snapshot, SnapshotPayload, SnapshotRecord};
pub use tags::Tags;
pub use types::{
    CertificateCredential, Credential, CredentialInfo, CredentialKind, FileCredential,
    JsonCredential, SshUserPrivateKeyCredential, StringCredential, UsernamePasswordCredential,
    UsernameSecretCredential,
};
