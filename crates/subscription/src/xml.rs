//! Subscription XML codec.
//!
//! Parses IMS subscription documents (`<IMSSubscription>` with
//! `<ServiceProfile>`/`<PublicIdentity>` children) into identity lists,
//! and builds the `<ClearwaterRegData>` reply body sent to the router.
//! All parsing strips XML namespaces: only local names are matched, and
//! `xmlns` attributes are dropped when a subscription is cloned into a
//! reply.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use cx_domain::error::{Error, Result};
use cx_domain::types::{ChargingAddresses, RegistrationState};

const IMS_SUBSCRIPTION: &[u8] = b"IMSSubscription";
const SERVICE_PROFILE: &[u8] = b"ServiceProfile";
const PUBLIC_IDENTITY: &[u8] = b"PublicIdentity";
const IDENTITY: &[u8] = b"Identity";
const BARRING_INDICATION: &[u8] = b"BarringIndication";
const IDENTITY_TYPE: &[u8] = b"IdentityType";
const WILDCARDED_IMPU: &[u8] = b"WildcardedIMPU";
const PRIVATE_ID: &[u8] = b"PrivateID";

const STATE_UNBARRED: &str = "0";
const IDENTITY_TYPE_WILDCARD: &str = "3";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identity extraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// All public identities in the document, in order, deduplicated.
pub fn get_public_ids(user_data: &str) -> Vec<String> {
    get_public_and_default_ids(user_data).0
}

/// The default public identity: the first whose `<BarringIndication>` is
/// absent or zero. `None` when every identity is barred or none parse.
pub fn get_default_id(user_data: &str) -> Option<String> {
    get_public_and_default_ids(user_data).1
}

/// One accumulating `<PublicIdentity>` element.
#[derive(Default)]
struct PendingIdentity {
    identity: Option<String>,
    barring: Option<String>,
    identity_type: Option<String>,
    wildcarded_impu: Option<String>,
}

impl PendingIdentity {
    /// Resolve to the effective URI. A wildcarded identity (type 3)
    /// takes its URI from the nested `WildcardedIMPU` element.
    fn uri(&self) -> Option<String> {
        if self.identity_type.as_deref() == Some(IDENTITY_TYPE_WILDCARD) {
            if let Some(wildcard) = &self.wildcarded_impu {
                return Some(wildcard.clone());
            }
        }
        self.identity.clone()
    }

    fn barred(&self) -> bool {
        match &self.barring {
            Some(value) => value != STATE_UNBARRED,
            None => false,
        }
    }
}

/// Walk `IMSSubscription -> ServiceProfile -> PublicIdentity -> Identity`
/// collecting every public identity plus the first unbarred one.
///
/// A malformed document yields whatever was collected before the error,
/// matching the lenient read path (the strict path is
/// [`build_reg_data_xml`], which refuses malformed input).
pub fn get_public_and_default_ids(user_data: &str) -> (Vec<String>, Option<String>) {
    let mut reader = Reader::from_str(user_data);

    let mut public_ids: Vec<String> = Vec::new();
    let mut default_id: Option<String> = None;

    // Local-name path from the document root to the current element.
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut pending: Option<PendingIdentity> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == PUBLIC_IDENTITY && in_service_profile(&path) {
                    pending = Some(PendingIdentity::default());
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                let name = path.pop();
                if name.as_deref() == Some(PUBLIC_IDENTITY) && in_service_profile(&path) {
                    if let Some(p) = pending.take() {
                        finish_identity(p, &mut public_ids, &mut default_id);
                    }
                }
            }
            Ok(Event::Empty(_)) => {}
            Ok(Event::Text(t)) => {
                let Some(p) = pending.as_mut() else { continue };
                let Ok(text) = t.unescape() else { continue };
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match path.last().map(|n| n.as_slice()) {
                    Some(n) if n == IDENTITY && parent_is(&path, PUBLIC_IDENTITY) => {
                        p.identity = Some(text.to_owned());
                    }
                    Some(n) if n == BARRING_INDICATION && parent_is(&path, PUBLIC_IDENTITY) => {
                        p.barring = Some(text.to_owned());
                    }
                    Some(n) if n == IDENTITY_TYPE => {
                        p.identity_type = Some(text.to_owned());
                    }
                    Some(n) if n == WILDCARDED_IMPU => {
                        p.wildcarded_impu = Some(text.to_owned());
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "parse error in IMS subscription document");
                break;
            }
        }
    }

    if public_ids.is_empty() {
        tracing::debug!("no PublicIdentity/Identity nodes in subscription document");
    }

    (public_ids, default_id)
}

fn finish_identity(
    pending: PendingIdentity,
    public_ids: &mut Vec<String>,
    default_id: &mut Option<String>,
) {
    let Some(uri) = pending.uri() else {
        tracing::warn!("PublicIdentity node was missing an Identity child");
        return;
    };
    if public_ids.contains(&uri) {
        return;
    }
    if default_id.is_none() && !pending.barred() {
        *default_id = Some(uri.clone());
    }
    public_ids.push(uri);
}

fn in_service_profile(path: &[Vec<u8>]) -> bool {
    matches!(path, [root, sp] if root == IMS_SUBSCRIPTION && sp == SERVICE_PROFILE)
}

fn parent_is(path: &[Vec<u8>], name: &[u8]) -> bool {
    path.len() >= 2 && path[path.len() - 2] == name
}

/// The `<PrivateID>` directly under the subscription root. The literal
/// string `"null"` (provisioned placeholder) reads as empty.
pub fn get_private_id(user_data: &str) -> String {
    let mut reader = Reader::from_str(user_data);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut impi = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => path.push(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                if path.len() == 2 && path[0] == IMS_SUBSCRIPTION && path[1] == PRIVATE_ID {
                    if let Ok(text) = t.unescape() {
                        impi = text.trim().to_owned();
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "parse error in IMS subscription document");
                break;
            }
        }
    }

    if impi == "null" {
        impi.clear();
    }
    impi
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ClearwaterRegData builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the `<ClearwaterRegData>` reply body: registration state, the
/// previous state when `previous` is given (REG/CALL replies only), the
/// cloned subscription document, and up to two CCFs/ECFs with positional
/// `priority` attributes.
///
/// A malformed subscription, or one missing the `<IMSSubscription>`
/// root, is an error (the caller maps it to a 500).
pub fn build_reg_data_xml(
    state: RegistrationState,
    user_data: &str,
    charging_addrs: &ChargingAddresses,
    previous: Option<RegistrationState>,
) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Start(BytesStart::new("ClearwaterRegData")))
        .map_err(xml_err)?;

    write_text_element(&mut writer, "RegistrationState", state.as_str())?;
    if let Some(prev) = previous {
        write_text_element(&mut writer, "PreviousRegistrationState", prev.as_str())?;
    }

    if !user_data.is_empty() {
        copy_subscription(user_data, &mut writer)?;
    }

    if !charging_addrs.is_empty() {
        write_charging_addrs(&mut writer, charging_addrs)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("ClearwaterRegData")))
        .map_err(xml_err)?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Stream-copy the `<IMSSubscription>` element of `user_data` into
/// `writer`, rewriting every tag to its local name and dropping `xmlns`
/// attributes.
fn copy_subscription(user_data: &str, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    let mut reader = Reader::from_str(user_data);

    // Find the root element; anything other than IMSSubscription is a
    // document we refuse to forward.
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                if e.local_name().as_ref() != IMS_SUBSCRIPTION {
                    return Err(Error::Xml("missing IMSSubscription root".into()));
                }
                writer
                    .write_event(Event::Start(stripped_start(&e)?))
                    .map_err(xml_err)?;
                break;
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() != IMS_SUBSCRIPTION {
                    return Err(Error::Xml("missing IMSSubscription root".into()));
                }
                writer
                    .write_event(Event::Empty(stripped_start(&e)?))
                    .map_err(xml_err)?;
                return Ok(());
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Text(t) => {
                // Whitespace between the declaration and the root only.
                let text = t.unescape().map_err(xml_err)?;
                if !text.trim().is_empty() {
                    return Err(Error::Xml("missing IMSSubscription root".into()));
                }
            }
            Event::Eof => return Err(Error::Xml("missing IMSSubscription root".into())),
            _ => return Err(Error::Xml("missing IMSSubscription root".into())),
        }
    }

    let mut depth = 1u32;
    while depth > 0 {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                depth += 1;
                writer
                    .write_event(Event::Start(stripped_start(&e)?))
                    .map_err(xml_err)?;
            }
            Event::Empty(e) => {
                writer
                    .write_event(Event::Empty(stripped_start(&e)?))
                    .map_err(xml_err)?;
            }
            Event::End(e) => {
                depth -= 1;
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(xml_err)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_err)?;
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(xml_err)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(xml_err)?;
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => return Err(Error::Xml("truncated IMSSubscription element".into())),
        }
    }

    Ok(())
}

/// Copy of a start tag with the namespace prefix and `xmlns` attributes
/// removed.
fn stripped_start(e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let k = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let v = attr
            .unescape_value()
            .map_err(xml_err)?
            .into_owned();
        out.push_attribute((k.as_str(), v.as_str()));
    }
    Ok(out)
}

fn write_charging_addrs(
    writer: &mut Writer<Vec<u8>>,
    charging_addrs: &ChargingAddresses,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("ChargingAddresses")))
        .map_err(xml_err)?;
    for (i, ccf) in charging_addrs.ccfs.iter().take(2).enumerate() {
        write_prioritised(writer, "CCF", ccf, i + 1)?;
    }
    for (i, ecf) in charging_addrs.ecfs.iter().take(2).enumerate() {
        write_prioritised(writer, "ECF", ecf, i + 1)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("ChargingAddresses")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_prioritised(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
    priority: usize,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    let priority = priority.to_string();
    start.push_attribute(("priority", priority.as_str()));
    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Xml(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBSCRIPTION: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
        "<IMSSubscription>",
        "<PrivateID>alice@example.com</PrivateID>",
        "<ServiceProfile>",
        "<PublicIdentity><Identity>sip:alice@example.com</Identity></PublicIdentity>",
        "<PublicIdentity><Identity>sip:alice2@example.com</Identity>",
        "<BarringIndication>1</BarringIndication></PublicIdentity>",
        "<PublicIdentity><Identity>tel:+15551234</Identity>",
        "<BarringIndication>0</BarringIndication></PublicIdentity>",
        "</ServiceProfile>",
        "</IMSSubscription>",
    );

    #[test]
    fn extracts_public_ids_in_order() {
        let ids = get_public_ids(SUBSCRIPTION);
        assert_eq!(
            ids,
            vec![
                "sip:alice@example.com",
                "sip:alice2@example.com",
                "tel:+15551234"
            ]
        );
    }

    #[test]
    fn default_id_is_first_unbarred() {
        let barred_first = concat!(
            "<IMSSubscription><ServiceProfile>",
            "<PublicIdentity><Identity>sip:a@ex</Identity>",
            "<BarringIndication>1</BarringIndication></PublicIdentity>",
            "<PublicIdentity><Identity>sip:b@ex</Identity></PublicIdentity>",
            "</ServiceProfile></IMSSubscription>",
        );
        assert_eq!(get_default_id(barred_first), Some("sip:b@ex".to_owned()));
    }

    #[test]
    fn all_barred_yields_no_default() {
        let all_barred = concat!(
            "<IMSSubscription><ServiceProfile>",
            "<PublicIdentity><Identity>sip:a@ex</Identity>",
            "<BarringIndication>1</BarringIndication></PublicIdentity>",
            "</ServiceProfile></IMSSubscription>",
        );
        let (ids, default) = get_public_and_default_ids(all_barred);
        assert_eq!(ids, vec!["sip:a@ex"]);
        assert_eq!(default, None);
    }

    #[test]
    fn duplicate_identities_are_deduped() {
        let dup = concat!(
            "<IMSSubscription><ServiceProfile>",
            "<PublicIdentity><Identity>sip:a@ex</Identity></PublicIdentity>",
            "<PublicIdentity><Identity>sip:a@ex</Identity></PublicIdentity>",
            "</ServiceProfile></IMSSubscription>",
        );
        assert_eq!(get_public_ids(dup), vec!["sip:a@ex"]);
    }

    #[test]
    fn wildcard_extension_replaces_identity() {
        let wildcard = concat!(
            "<IMSSubscription><ServiceProfile>",
            "<PublicIdentity><Identity>sip:placeholder@ex</Identity>",
            "<Extension><IdentityType>3</IdentityType>",
            "<Extension><Extension>",
            "<WildcardedIMPU>sip:im!.*!@ex</WildcardedIMPU>",
            "</Extension></Extension></Extension>",
            "</PublicIdentity>",
            "</ServiceProfile></IMSSubscription>",
        );
        assert_eq!(get_public_ids(wildcard), vec!["sip:im!.*!@ex"]);
    }

    #[test]
    fn namespaced_document_parses_by_local_name() {
        let namespaced = concat!(
            "<ims:IMSSubscription xmlns:ims=\"urn:example\">",
            "<ims:PrivateID>alice@example.com</ims:PrivateID>",
            "<ims:ServiceProfile>",
            "<ims:PublicIdentity><ims:Identity>sip:a@ex</ims:Identity></ims:PublicIdentity>",
            "</ims:ServiceProfile>",
            "</ims:IMSSubscription>",
        );
        assert_eq!(get_public_ids(namespaced), vec!["sip:a@ex"]);
        assert_eq!(get_private_id(namespaced), "alice@example.com");
    }

    #[test]
    fn private_id_null_reads_empty() {
        let xml = "<IMSSubscription><PrivateID>null</PrivateID></IMSSubscription>";
        assert_eq!(get_private_id(xml), "");
    }

    #[test]
    fn malformed_document_yields_empties() {
        let xml = "?xml veron=\"1.0\" encoding=\"UTF-8\"?>";
        assert!(get_public_ids(xml).is_empty());
        assert_eq!(get_private_id(xml), "");
    }

    #[test]
    fn builds_reg_data_with_charging() {
        let addrs = ChargingAddresses::new(
            vec!["ccf1".into(), "ccf2".into()],
            vec!["ecf1".into(), "ecf2".into()],
        );
        let body = build_reg_data_xml(
            RegistrationState::Registered,
            "<?xml version=\"1.0\"?><IMSSubscription>test</IMSSubscription>",
            &addrs,
            None,
        )
        .unwrap();
        assert_eq!(
            body,
            concat!(
                "<ClearwaterRegData>",
                "<RegistrationState>REGISTERED</RegistrationState>",
                "<IMSSubscription>test</IMSSubscription>",
                "<ChargingAddresses>",
                "<CCF priority=\"1\">ccf1</CCF>",
                "<CCF priority=\"2\">ccf2</CCF>",
                "<ECF priority=\"1\">ecf1</ECF>",
                "<ECF priority=\"2\">ecf2</ECF>",
                "</ChargingAddresses>",
                "</ClearwaterRegData>",
            )
        );
    }

    #[test]
    fn builds_reg_data_with_previous_state() {
        let body = build_reg_data_xml(
            RegistrationState::Registered,
            "<IMSSubscription>test</IMSSubscription>",
            &ChargingAddresses::default(),
            Some(RegistrationState::NotRegistered),
        )
        .unwrap();
        assert_eq!(
            body,
            concat!(
                "<ClearwaterRegData>",
                "<RegistrationState>REGISTERED</RegistrationState>",
                "<PreviousRegistrationState>NOT_REGISTERED</PreviousRegistrationState>",
                "<IMSSubscription>test</IMSSubscription>",
                "</ClearwaterRegData>",
            )
        );
    }

    #[test]
    fn builds_reg_data_without_subscription() {
        let body = build_reg_data_xml(
            RegistrationState::NotRegistered,
            "",
            &ChargingAddresses::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            body,
            concat!(
                "<ClearwaterRegData>",
                "<RegistrationState>NOT_REGISTERED</RegistrationState>",
                "</ClearwaterRegData>",
            )
        );
    }

    #[test]
    fn strips_namespaces_when_cloning() {
        let body = build_reg_data_xml(
            RegistrationState::Registered,
            "<ims:IMSSubscription xmlns:ims=\"urn:example\">\
             <ims:PrivateID>a@ex</ims:PrivateID></ims:IMSSubscription>",
            &ChargingAddresses::default(),
            None,
        )
        .unwrap();
        assert!(body.contains("<IMSSubscription><PrivateID>a@ex</PrivateID></IMSSubscription>"));
        assert!(!body.contains("xmlns"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = build_reg_data_xml(
            RegistrationState::Registered,
            "<IMSSubscriptionwrong>test</IMSSubscriptionwrong>",
            &ChargingAddresses::default(),
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn malformed_subscription_is_an_error() {
        let err = build_reg_data_xml(
            RegistrationState::Registered,
            "<?xml?><InvalidXML</IMSSubscription>",
            &ChargingAddresses::default(),
            None,
        );
        assert!(err.is_err());
    }
}
