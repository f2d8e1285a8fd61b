//! Storage seam for the subscriber-data cache.

use async_trait::async_trait;
use cx_subscription::{ImplicitRegistrationSet, ImsSubscription};

/// Cache operation outcomes as seen by tasks. `NotFound` is a normal
/// outcome on reads (and benign on deletes); `Unavailable` covers an
/// unreachable or internally-errored backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("not found")]
    NotFound,

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// The concrete cache store.
///
/// Mutations are split into a *primary* phase (durable enough that the
/// caller may answer its upstream client) and an *index* phase (mapping
/// tables, secondary indices). The [`crate::CacheProcessor`] signals
/// progress between the two and success after the second.
#[async_trait]
pub trait HssCacheBackend: Send + Sync {
    /// Fetch the registration set covering `impu` (any public identity
    /// in the set resolves).
    async fn read_irs(&self, impu: &str) -> Result<ImplicitRegistrationSet, CacheError>;

    /// Fetch the distinct registration sets covering any of `impus`.
    /// Unknown identities are skipped, not errors.
    async fn read_irs_for_impus(
        &self,
        impus: &[String],
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError>;

    /// Fetch the distinct registration sets associated with any of
    /// `impis`, via the private-identity mapping table.
    async fn read_irs_for_impis(
        &self,
        impis: &[String],
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError>;

    /// Primary write: the set itself plus its public-identity aliases.
    async fn write_irs(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError>;

    /// Index write: private-identity → default-public-identity mappings.
    async fn write_impi_index(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError>;

    /// Primary delete: the set and every public-identity alias in its
    /// subscription document.
    async fn remove_irs(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError>;

    /// Index delete: the associated private-identity mappings.
    async fn remove_impi_index(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError>;

    /// Every registration set associated with `impi`.
    async fn read_subscription(&self, impi: &str) -> Result<ImsSubscription, CacheError>;

    /// Primary write of a subscription: only members touched since
    /// retrieval are written.
    async fn write_subscription(&self, sub: &ImsSubscription) -> Result<(), CacheError>;

    /// Index write for the touched members of a subscription.
    async fn write_subscription_index(&self, sub: &ImsSubscription) -> Result<(), CacheError>;
}
