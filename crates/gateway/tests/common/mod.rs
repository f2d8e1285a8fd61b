//! Shared fixtures: a scripted HSS connection, a recording router
//! notifier, and an AppState wired over the in-memory cache backend.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use cx_cache::{CacheProcessor, MemoryBackend};
use cx_domain::config::Config;
use cx_domain::error::{Error, Result};
use cx_domain::types::RegistrationState;
use cx_gateway::notifier::RouterNotifier;
use cx_gateway::overload::{HealthChecker, PenaltyCounter};
use cx_gateway::state::AppState;
use cx_hss::connection::HssConnection;
use cx_hss::types::*;
use cx_subscription::ImplicitRegistrationSet;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted HSS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct FakeHss {
    pub maa: Mutex<VecDeque<MultimediaAuthAnswer>>,
    pub uaa: Mutex<VecDeque<UserAuthAnswer>>,
    pub lia: Mutex<VecDeque<LocationInfoAnswer>>,
    pub saa: Mutex<VecDeque<ServerAssignmentAnswer>>,
    pub mar_requests: Mutex<Vec<MultimediaAuthRequest>>,
    pub uar_requests: Mutex<Vec<UserAuthRequest>>,
    pub lir_requests: Mutex<Vec<LocationInfoRequest>>,
    pub sar_requests: Mutex<Vec<ServerAssignmentRequest>>,
}

impl FakeHss {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_maa(&self, answer: MultimediaAuthAnswer) {
        self.maa.lock().push_back(answer);
    }

    pub fn push_uaa(&self, answer: UserAuthAnswer) {
        self.uaa.lock().push_back(answer);
    }

    pub fn push_lia(&self, answer: LocationInfoAnswer) {
        self.lia.lock().push_back(answer);
    }

    pub fn push_saa(&self, answer: ServerAssignmentAnswer) {
        self.saa.lock().push_back(answer);
    }
}

#[async_trait]
impl HssConnection for FakeHss {
    async fn multimedia_auth(
        &self,
        request: MultimediaAuthRequest,
        _trail: Uuid,
    ) -> MultimediaAuthAnswer {
        self.mar_requests.lock().push(request);
        self.maa.lock().pop_front().expect("unexpected MAR")
    }

    async fn user_auth(&self, request: UserAuthRequest, _trail: Uuid) -> UserAuthAnswer {
        self.uar_requests.lock().push(request);
        self.uaa.lock().pop_front().expect("unexpected UAR")
    }

    async fn location_info(
        &self,
        request: LocationInfoRequest,
        _trail: Uuid,
    ) -> LocationInfoAnswer {
        self.lir_requests.lock().push(request);
        self.lia.lock().pop_front().expect("unexpected LIR")
    }

    async fn server_assignment(
        &self,
        request: ServerAssignmentRequest,
        _trail: Uuid,
    ) -> ServerAssignmentAnswer {
        self.sar_requests.lock().push(request);
        self.saa.lock().pop_front().expect("unexpected SAR")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recording router notifier
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct DeregCall {
    pub send_notifications: bool,
    pub impus: Vec<String>,
    pub impis: Vec<String>,
}

pub struct RecordingNotifier {
    pub calls: Mutex<Vec<DeregCall>>,
    pub status: Mutex<Result<u16>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            status: Mutex::new(Ok(200)),
        })
    }

    pub fn set_status(&self, status: Result<u16>) {
        *self.status.lock() = status;
    }
}

#[async_trait]
impl RouterNotifier for RecordingNotifier {
    async fn deregister_bindings(
        &self,
        send_notifications: bool,
        impus: &[String],
        impis: &[String],
        _trail: Uuid,
    ) -> Result<u16> {
        self.calls.lock().push(DeregCall {
            send_notifications,
            impus: impus.to_vec(),
            impis: impis.to_vec(),
        });
        match &*self.status.lock() {
            Ok(status) => Ok(*status),
            Err(e) => Err(Error::Http(e.to_string())),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixture wiring
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Fixture {
    pub state: AppState,
    pub backend: Arc<MemoryBackend>,
    pub hss: Arc<FakeHss>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn fixture() -> Fixture {
    let mut config = Config::default();
    config.hss.dest_realm = "hss.example.com".into();
    config.hss.default_realm = "home.example.com".into();
    config.hss.server_name = "sip:scscf.example.com".into();

    let backend = Arc::new(MemoryBackend::new());
    let cache = Arc::new(CacheProcessor::new(backend.clone(), 2, 32));
    let hss = FakeHss::new();
    let notifier = RecordingNotifier::new();

    let state = AppState {
        config: Arc::new(config),
        cache,
        hss: hss.clone(),
        router: notifier.clone(),
        health: Arc::new(HealthChecker::default()),
        penalties: Arc::new(PenaltyCounter::default()),
    };

    Fixture {
        state,
        backend,
        hss,
        notifier,
    }
}

/// A registration set built from a generated subscription document.
pub fn build_irs(impus: &[&str], impis: &[&str], state: RegistrationState, ttl: u32) -> ImplicitRegistrationSet {
    let mut irs = ImplicitRegistrationSet::new();
    irs.set_ims_sub_xml(subscription_xml(impis.first().copied().unwrap_or(""), impus));
    for impi in impis {
        irs.add_associated_impi(impi);
    }
    irs.set_reg_state(state);
    irs.set_ttl(ttl);
    irs
}

pub fn subscription_xml(private_id: &str, impus: &[&str]) -> String {
    let identities: String = impus
        .iter()
        .map(|impu| format!("<PublicIdentity><Identity>{impu}</Identity></PublicIdentity>"))
        .collect();
    format!(
        "<IMSSubscription><PrivateID>{private_id}</PrivateID>\
         <ServiceProfile>{identities}</ServiceProfile></IMSSubscription>"
    )
}

/// Write a set straight into the backend, index included.
pub async fn seed(backend: &MemoryBackend, irs: &ImplicitRegistrationSet) {
    use cx_cache::HssCacheBackend;
    backend.write_irs(irs).await.unwrap();
    backend.write_impi_index(irs).await.unwrap();
}

// ── request helpers ──────────────────────────────────────────────────

pub async fn send(app: Router, request: Request<Body>) -> (u16, String) {
    let response: Response<Body> = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn get(app: Router, uri: &str) -> (u16, String) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> (u16, String) {
    send(
        app,
        Request::builder()
            .method("PUT")
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}
