//! Authentication-vector, registration-status, and location endpoints.

mod common;

use base64::Engine;
use serde_json::{json, Value};

use common::*;
use cx_domain::types::{AkaAuthVector, AuthVector, DigestAuthVector, ServerCapabilities};
use cx_gateway::api;
use cx_hss::types::*;

fn digest_maa(ha1: &str) -> MultimediaAuthAnswer {
    MultimediaAuthAnswer {
        result: HssResult::Success,
        av: Some(AuthVector::Digest(DigestAuthVector {
            ha1: ha1.into(),
            realm: "example.com".into(),
            qop: String::new(),
        })),
        scheme: "SIP Digest".into(),
    }
}

fn aka_maa(version: u8) -> MultimediaAuthAnswer {
    let scheme = if version == 2 {
        "Digest-AKAv2-SHA-256"
    } else {
        "Digest-AKAv1-MD5"
    };
    MultimediaAuthAnswer {
        result: HssResult::Success,
        av: Some(AuthVector::Aka(AkaAuthVector {
            challenge: "chal".into(),
            response: "resp".into(),
            crypt_key: "ck".into(),
            integrity_key: "ik".into(),
            version,
        })),
        scheme: scheme.into(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AV lookup
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn digest_lookup_returns_ha1() {
    let f = fixture();
    f.hss.push_maa(digest_maa("abc"));

    let (status, body) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/digest?public_id=sip:a@ex",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"digest_ha1": "abc"})
    );

    let requests = f.hss.mar_requests.lock();
    assert_eq!(requests[0].impi, "_impi@ex");
    assert_eq!(requests[0].impu, "sip:a@ex");
    assert_eq!(requests[0].scheme, "SIP Digest");
    assert_eq!(requests[0].server_name, "sip:scscf.example.com");
}

#[tokio::test]
async fn digest_lookup_without_public_id_is_404() {
    let f = fixture();
    let (status, _) = get(api::router(f.state.clone()), "/impi/_impi@ex/digest").await;
    assert_eq!(status, 404);
    assert!(f.hss.mar_requests.lock().is_empty());
}

#[tokio::test]
async fn digest_url_refuses_aka_vector() {
    let f = fixture();
    f.hss.push_maa(aka_maa(1));
    let (status, _) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/digest?public_id=sip:a@ex",
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn full_av_returns_aka_body() {
    let f = fixture();
    f.hss.push_maa(aka_maa(2));

    let (status, body) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/aka2?impu=sip:a@ex",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"aka": {
            "challenge": "chal",
            "response": "resp",
            "cryptkey": "ck",
            "integritykey": "ik",
            "version": 2,
        }})
    );
    assert_eq!(f.hss.mar_requests.lock()[0].scheme, "Digest-AKAv2-SHA-256");
}

#[tokio::test]
async fn full_av_digest_body_defaults_qop() {
    let f = fixture();
    f.hss.push_maa(digest_maa("abc"));
    let (status, body) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/av?impu=sip:a@ex",
    )
    .await;
    assert_eq!(status, 200);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["digest"]["qop"], "auth");
    assert_eq!(parsed["digest"]["ha1"], "abc");
}

#[tokio::test]
async fn aka_url_refuses_digest_vector() {
    let f = fixture();
    f.hss.push_maa(digest_maa("abc"));
    let (status, _) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/aka?impu=sip:a@ex",
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn unknown_scheme_tail_is_404() {
    let f = fixture();
    let (status, _) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/bogus?impu=sip:a@ex",
    )
    .await;
    assert_eq!(status, 404);
    assert!(f.hss.mar_requests.lock().is_empty());
}

#[tokio::test]
async fn resync_auth_is_base64_decoded() {
    let f = fixture();
    f.hss.push_maa(aka_maa(1));
    let encoded = base64::engine::general_purpose::STANDARD.encode("nonce-material");
    let (status, _) = get(
        api::router(f.state.clone()),
        &format!("/impi/_impi@ex/aka?impu=sip:a@ex&resync-auth={encoded}&server-name=sip:other"),
    )
    .await;
    assert_eq!(status, 200);
    let requests = f.hss.mar_requests.lock();
    assert_eq!(requests[0].authorization, "nonce-material");
    assert_eq!(requests[0].server_name, "sip:other");
}

#[tokio::test]
async fn mar_error_mapping() {
    for (result, expected) in [
        (HssResult::NotFound, 404),
        (HssResult::ServerUnavailable, 503),
        (HssResult::Timeout, 504),
        (HssResult::Unknown, 500),
        (HssResult::UnknownAuthScheme, 500),
    ] {
        let f = fixture();
        f.hss.push_maa(MultimediaAuthAnswer::failure(result));
        let (status, _) = get(
            api::router(f.state.clone()),
            "/impi/_impi@ex/digest?public_id=sip:a@ex",
        )
        .await;
        assert_eq!(status, expected, "for {result:?}");
    }
}

#[tokio::test]
async fn mar_timeout_records_one_penalty() {
    let f = fixture();
    f.hss.push_maa(MultimediaAuthAnswer::failure(HssResult::Timeout));
    let (status, _) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/digest?public_id=sip:a@ex",
    )
    .await;
    assert_eq!(status, 504);
    assert_eq!(f.state.penalties.count(), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registration status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn registration_status_with_server_name() {
    let f = fixture();
    f.hss.push_uaa(UserAuthAnswer {
        result: HssResult::Success,
        json_result: 2001,
        server_name: "sip:scscf-2.example.com".into(),
        capabilities: Some(ServerCapabilities::default()),
    });

    let (status, body) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/registration-status?impu=sip:a@ex",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"result-code": 2001, "scscf": "sip:scscf-2.example.com"})
    );
    // A 200 here is the health-check criterion.
    assert_eq!(f.state.health.passes(), 1);

    let requests = f.hss.uar_requests.lock();
    assert_eq!(requests[0].visited_network, "home.example.com");
    assert!(!requests[0].emergency);
}

#[tokio::test]
async fn registration_status_forwards_query_parameters() {
    let f = fixture();
    f.hss.push_uaa(UserAuthAnswer {
        result: HssResult::Success,
        json_result: 2001,
        server_name: "sip:scscf".into(),
        capabilities: None,
    });

    let (status, _) = get(
        api::router(f.state.clone()),
        "/impi/_impi@ex/registration-status?impu=sip:a@ex&visited-network=visited.net&auth-type=REG&sos=true",
    )
    .await;
    assert_eq!(status, 200);
    let requests = f.hss.uar_requests.lock();
    assert_eq!(requests[0].visited_network, "visited.net");
    assert_eq!(requests[0].authorization_type, "REG");
    assert!(requests[0].emergency);
}

#[tokio::test]
async fn registration_status_error_mapping() {
    for (result, expected) in [
        (HssResult::NotFound, 404),
        (HssResult::Forbidden, 403),
        (HssResult::Timeout, 504),
        (HssResult::ServerUnavailable, 503),
        (HssResult::Unknown, 500),
    ] {
        let f = fixture();
        f.hss.push_uaa(UserAuthAnswer::failure(result));
        let (status, _) = get(
            api::router(f.state.clone()),
            "/impi/_impi@ex/registration-status?impu=sip:a@ex",
        )
        .await;
        assert_eq!(status, expected, "for {result:?}");
        assert_eq!(f.state.health.passes(), 0);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Location info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn location_with_capabilities_only() {
    let f = fixture();
    f.hss.push_lia(LocationInfoAnswer {
        result: HssResult::Success,
        json_result: 2001,
        server_name: String::new(),
        capabilities: Some(ServerCapabilities {
            mandatory_capabilities: vec![1, 3],
            optional_capabilities: vec![2, 4],
            server_name: String::new(),
        }),
        wildcard_impu: String::new(),
    });

    let (status, body) = get(api::router(f.state.clone()), "/impu/sip:a@ex/location").await;
    assert_eq!(status, 200);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({
            "result-code": 2001,
            "mandatory-capabilities": [1, 3],
            "optional-capabilities": [2, 4],
        })
    );
}

#[tokio::test]
async fn location_includes_wildcard_identity() {
    let f = fixture();
    f.hss.push_lia(LocationInfoAnswer {
        result: HssResult::Success,
        json_result: 2001,
        server_name: "sip:scscf".into(),
        capabilities: None,
        wildcard_impu: "sip:im!.*!@ex".into(),
    });

    let (status, body) = get(api::router(f.state.clone()), "/impu/sip:a@ex/location").await;
    assert_eq!(status, 200);
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["wildcard-identity"], "sip:im!.*!@ex");
    assert_eq!(parsed["scscf"], "sip:scscf");
}

#[tokio::test]
async fn location_error_mapping_has_no_forbidden_case() {
    for (result, expected) in [
        (HssResult::NotFound, 404),
        (HssResult::Timeout, 504),
        (HssResult::ServerUnavailable, 503),
        (HssResult::Forbidden, 500),
        (HssResult::Unknown, 500),
    ] {
        let f = fixture();
        f.hss.push_lia(LocationInfoAnswer::failure(result));
        let (status, _) = get(api::router(f.state.clone()), "/impu/sip:a@ex/location").await;
        assert_eq!(status, expected, "for {result:?}");
    }
}

#[tokio::test]
async fn location_timeout_records_penalty() {
    let f = fixture();
    f.hss.push_lia(LocationInfoAnswer::failure(HssResult::Timeout));
    let (status, _) = get(api::router(f.state.clone()), "/impu/sip:a@ex/location").await;
    assert_eq!(status, 504);
    assert_eq!(f.state.penalties.count(), 1);
}
