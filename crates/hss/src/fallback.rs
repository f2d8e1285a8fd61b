//! [`HssConnection`] backed by the local provisioning store.
//!
//! Used when no live HSS is configured. MAR answers digest vectors
//! straight from provisioned data; UAR answers are synthesised SUCCESS
//! pointing at the configured S-CSCF; LIR and registration-class SAR
//! read the provisioned registration data; every other SAR type is
//! short-circuited as SUCCESS with no payload (the caller is about to
//! drop its cached data anyway).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use cx_domain::error::{Error, Result};
use cx_domain::types::{AuthVector, ChargingAddresses, DigestAuthVector};

use crate::connection::HssConnection;
use crate::constants::DIAMETER_SUCCESS;
use crate::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provisioning store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug, Clone)]
pub enum ProvisioningError {
    #[error("not provisioned")]
    NotFound,

    #[error("provisioning store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the provisioning database.
#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    /// Digest credentials for a private identity. When `impu` is
    /// non-empty it must be one of the subscriber's public identities.
    async fn auth_vector(
        &self,
        impi: &str,
        impu: &str,
    ) -> std::result::Result<DigestAuthVector, ProvisioningError>;

    /// Subscription XML plus charging addresses for a public identity.
    async fn reg_data(
        &self,
        impu: &str,
    ) -> std::result::Result<(String, ChargingAddresses), ProvisioningError>;
}

// ── TOML-file store ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SubscriberFile {
    #[serde(default)]
    subscriber: Vec<SubscriberRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriberRecord {
    impi: String,
    #[serde(default)]
    digest_ha1: String,
    #[serde(default)]
    digest_realm: String,
    #[serde(default)]
    digest_qop: String,
    #[serde(default)]
    public_ids: Vec<String>,
    #[serde(default)]
    ims_subscription: String,
    #[serde(default)]
    ccfs: Vec<String>,
    #[serde(default)]
    ecfs: Vec<String>,
}

/// Subscribers provisioned from a local TOML file, loaded once at
/// startup.
#[derive(Default)]
pub struct FileProvisioningStore {
    by_impi: HashMap<String, SubscriberRecord>,
    by_impu: HashMap<String, SubscriberRecord>,
}

impl FileProvisioningStore {
    /// An empty store; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: SubscriberFile = toml::from_str(&raw)
            .map_err(|e| Error::Provisioning(format!("{}: {e}", path.display())))?;

        let mut store = Self::default();
        for record in file.subscriber {
            for impu in &record.public_ids {
                store.by_impu.insert(impu.clone(), record.clone());
            }
            store.by_impi.insert(record.impi.clone(), record);
        }
        tracing::info!(
            path = %path.display(),
            subscribers = store.by_impi.len(),
            "provisioning store loaded"
        );
        Ok(store)
    }
}

#[async_trait]
impl ProvisioningStore for FileProvisioningStore {
    async fn auth_vector(
        &self,
        impi: &str,
        impu: &str,
    ) -> std::result::Result<DigestAuthVector, ProvisioningError> {
        let record = self.by_impi.get(impi).ok_or(ProvisioningError::NotFound)?;
        if !impu.is_empty() && !record.public_ids.iter().any(|id| id == impu) {
            return Err(ProvisioningError::NotFound);
        }
        Ok(DigestAuthVector {
            ha1: record.digest_ha1.clone(),
            realm: record.digest_realm.clone(),
            qop: record.digest_qop.clone(),
        })
    }

    async fn reg_data(
        &self,
        impu: &str,
    ) -> std::result::Result<(String, ChargingAddresses), ProvisioningError> {
        let record = self.by_impu.get(impu).ok_or(ProvisioningError::NotFound)?;
        Ok((
            record.ims_subscription.clone(),
            ChargingAddresses::new(record.ccfs.clone(), record.ecfs.clone()),
        ))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ProvisioningHssConnection {
    store: Arc<dyn ProvisioningStore>,
    server_name: String,
    scheme_digest: String,
}

impl ProvisioningHssConnection {
    pub fn new(
        store: Arc<dyn ProvisioningStore>,
        server_name: String,
        scheme_digest: String,
    ) -> Self {
        Self {
            store,
            server_name,
            scheme_digest,
        }
    }
}

/// A store error that is not a miss reads as an upstream timeout, so
/// the task answers 504 and the router retries elsewhere.
fn store_outcome(e: ProvisioningError) -> HssResult {
    match e {
        ProvisioningError::NotFound => HssResult::NotFound,
        ProvisioningError::Unavailable(reason) => {
            tracing::warn!(%reason, "provisioning store query failed");
            HssResult::Timeout
        }
    }
}

#[async_trait]
impl HssConnection for ProvisioningHssConnection {
    async fn multimedia_auth(
        &self,
        request: MultimediaAuthRequest,
        trail: Uuid,
    ) -> MultimediaAuthAnswer {
        tracing::debug!(%trail, impi = %request.impi, "answering MAR from provisioning data");
        match self.store.auth_vector(&request.impi, &request.impu).await {
            Ok(av) => MultimediaAuthAnswer {
                result: HssResult::Success,
                av: Some(AuthVector::Digest(av)),
                scheme: self.scheme_digest.clone(),
            },
            Err(e) => MultimediaAuthAnswer::failure(store_outcome(e)),
        }
    }

    async fn user_auth(&self, _request: UserAuthRequest, trail: Uuid) -> UserAuthAnswer {
        tracing::debug!(%trail, "synthesising UAA from provisioning config");
        UserAuthAnswer {
            result: HssResult::Success,
            json_result: DIAMETER_SUCCESS,
            server_name: self.server_name.clone(),
            capabilities: None,
        }
    }

    async fn location_info(
        &self,
        request: LocationInfoRequest,
        trail: Uuid,
    ) -> LocationInfoAnswer {
        tracing::debug!(%trail, impu = %request.impu, "answering LIR from provisioning data");
        match self.store.reg_data(&request.impu).await {
            Ok(_) => LocationInfoAnswer {
                result: HssResult::Success,
                json_result: DIAMETER_SUCCESS,
                server_name: self.server_name.clone(),
                capabilities: None,
                wildcard_impu: String::new(),
            },
            Err(e) => LocationInfoAnswer::failure(store_outcome(e)),
        }
    }

    async fn server_assignment(
        &self,
        request: ServerAssignmentRequest,
        trail: Uuid,
    ) -> ServerAssignmentAnswer {
        if !request.assignment_type.is_registration_class() {
            // Nothing provisioned to return; the caller is clearing
            // its cached data.
            return ServerAssignmentAnswer {
                result: HssResult::Success,
                charging_addresses: ChargingAddresses::default(),
                service_profile: String::new(),
                wildcard_impu: String::new(),
            };
        }

        tracing::debug!(%trail, impu = %request.impu, "answering SAR from provisioning data");
        match self.store.reg_data(&request.impu).await {
            Ok((xml, charging)) => ServerAssignmentAnswer {
                result: HssResult::Success,
                charging_addresses: charging,
                service_profile: xml,
                wildcard_impu: String::new(),
            },
            Err(e) => ServerAssignmentAnswer::failure(store_outcome(e)),
        }
    }
}
