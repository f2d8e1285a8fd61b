//! Router-facing JSON bodies.
//!
//! Stateless builders for the authentication-vector and
//! S-CSCF-selection responses. Capability arrays are always emitted,
//! empty arrays included, so the router never has to probe for them.

use serde_json::{json, Map, Value};

use cx_domain::types::{AkaAuthVector, DigestAuthVector, ServerCapabilities};

/// Body for `GET /impi/{impi}/digest`.
pub fn digest_ha1(av: &DigestAuthVector) -> Value {
    json!({ "digest_ha1": av.ha1 })
}

/// Digest body for the full-AV endpoint. An empty qop reads as `auth`.
pub fn digest_av(av: &DigestAuthVector) -> Value {
    let qop = if av.qop.is_empty() { "auth" } else { &av.qop };
    json!({
        "digest": {
            "ha1": av.ha1,
            "realm": av.realm,
            "qop": qop,
        }
    })
}

/// AKA body for the full-AV endpoint.
pub fn aka_av(av: &AkaAuthVector) -> Value {
    json!({
        "aka": {
            "challenge": av.challenge,
            "response": av.response,
            "cryptkey": av.crypt_key,
            "integritykey": av.integrity_key,
            "version": av.version,
        }
    })
}

/// S-CSCF selection body shared by registration-status and location.
///
/// A directly-assigned server name wins outright. Otherwise the
/// capabilities are emitted, preferring a server name carried inside
/// them when present.
pub fn server_selection(
    json_result: i32,
    server_name: &str,
    capabilities: Option<&ServerCapabilities>,
    wildcard: Option<&str>,
) -> Value {
    let mut body = Map::new();
    body.insert("result-code".into(), json!(json_result));

    if !server_name.is_empty() {
        body.insert("scscf".into(), json!(server_name));
    } else {
        let default = ServerCapabilities::default();
        let caps = capabilities.unwrap_or(&default);
        if !caps.server_name.is_empty() {
            body.insert("scscf".into(), json!(caps.server_name));
        }
        body.insert(
            "mandatory-capabilities".into(),
            json!(caps.mandatory_capabilities),
        );
        body.insert(
            "optional-capabilities".into(),
            json!(caps.optional_capabilities),
        );
    }

    if let Some(wildcard) = wildcard {
        body.insert("wildcard-identity".into(), json!(wildcard));
    }

    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_av_defaults_qop() {
        let av = DigestAuthVector {
            ha1: "abc".into(),
            realm: "ex".into(),
            qop: String::new(),
        };
        assert_eq!(digest_av(&av)["digest"]["qop"], "auth");
    }

    #[test]
    fn server_name_suppresses_capabilities() {
        let caps = ServerCapabilities {
            mandatory_capabilities: vec![1],
            optional_capabilities: vec![2],
            server_name: String::new(),
        };
        let body = server_selection(2001, "sip:scscf", Some(&caps), None);
        assert_eq!(body["scscf"], "sip:scscf");
        assert!(body.get("mandatory-capabilities").is_none());
    }

    #[test]
    fn capability_arrays_always_present_without_server_name() {
        let body = server_selection(2001, "", None, None);
        assert_eq!(body["mandatory-capabilities"], json!([]));
        assert_eq!(body["optional-capabilities"], json!([]));
        assert!(body.get("scscf").is_none());
    }

    #[test]
    fn capabilities_may_carry_the_server_name() {
        let caps = ServerCapabilities {
            mandatory_capabilities: vec![1, 3],
            optional_capabilities: vec![2, 4],
            server_name: "sip:preferred".into(),
        };
        let body = server_selection(2001, "", Some(&caps), Some("sip:im!.*!@ex"));
        assert_eq!(body["scscf"], "sip:preferred");
        assert_eq!(body["mandatory-capabilities"], json!([1, 3]));
        assert_eq!(body["wildcard-identity"], "sip:im!.*!@ex");
    }
}
