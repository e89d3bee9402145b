//! PPP and interface operations over an open session.
//!
//! Each function sends one command (or a lookup followed by one command) on
//! an already authenticated [`Session`]. Trap replies surface as
//! [`RouterOsError::Trap`].

use crate::error::{Result, RouterOsError};
use crate::protocol::{AttributeMap, Response};
use crate::session::Session;
use crate::transport::Stream;

/// Command paths used by the operations in this module.
pub mod paths {
    /// List interfaces.
    pub const INTERFACE_PRINT: &str = "/interface/print";
    /// List PPP profiles.
    pub const PPP_PROFILE_PRINT: &str = "/ppp/profile/print";
    /// Add a PPP profile.
    pub const PPP_PROFILE_ADD: &str = "/ppp/profile/add";
    /// List PPP secrets.
    pub const PPP_SECRET_PRINT: &str = "/ppp/secret/print";
    /// Add a PPP secret.
    pub const PPP_SECRET_ADD: &str = "/ppp/secret/add";
    /// Enable a PPP secret by `.id`.
    pub const PPP_SECRET_ENABLE: &str = "/ppp/secret/enable";
    /// Disable a PPP secret by `.id`.
    pub const PPP_SECRET_DISABLE: &str = "/ppp/secret/disable";
    /// Remove a PPP secret by `.id`.
    pub const PPP_SECRET_REMOVE: &str = "/ppp/secret/remove";
    /// List IP pools.
    pub const IP_POOL_PRINT: &str = "/ip/pool/print";
    /// Add an IP pool.
    pub const IP_POOL_ADD: &str = "/ip/pool/add";
    /// Add a VLAN interface.
    pub const VLAN_ADD: &str = "/interface/vlan/add";
    /// Add a PPPoE server.
    pub const PPPOE_SERVER_ADD: &str = "/interface/pppoe-server/server/add";
}

/// Profile used by a PPPoE server when none is given.
pub const DEFAULT_PPPOE_PROFILE: &str = "default";

/// List all interfaces.
pub async fn list_interfaces<S: Stream>(session: &mut Session<S>) -> Result<Vec<AttributeMap>> {
    list(session, paths::INTERFACE_PRINT).await
}

/// List PPP profiles.
pub async fn list_ppp_profiles<S: Stream>(session: &mut Session<S>) -> Result<Vec<AttributeMap>> {
    list(session, paths::PPP_PROFILE_PRINT).await
}

/// List PPP secrets.
pub async fn list_ppp_secrets<S: Stream>(session: &mut Session<S>) -> Result<Vec<AttributeMap>> {
    list(session, paths::PPP_SECRET_PRINT).await
}

/// List IP pools.
pub async fn list_ip_pools<S: Stream>(session: &mut Session<S>) -> Result<Vec<AttributeMap>> {
    list(session, paths::IP_POOL_PRINT).await
}

/// Add a PPP secret. Keys in `extra` override `name`/`password`.
pub async fn create_ppp_secret<S: Stream>(
    session: &mut Session<S>,
    name: &str,
    password: &str,
    extra: &AttributeMap,
) -> Result<Response> {
    let attributes = merge(&[("name", name), ("password", password)], extra);
    run(session, paths::PPP_SECRET_ADD, &attributes).await
}

/// Add a PPP profile.
pub async fn create_ppp_profile<S: Stream>(
    session: &mut Session<S>,
    name: &str,
    extra: &AttributeMap,
) -> Result<Response> {
    let attributes = merge(&[("name", name)], extra);
    run(session, paths::PPP_PROFILE_ADD, &attributes).await
}

/// Add an IP pool covering `ranges` (e.g. `10.0.0.2-10.0.0.254`).
pub async fn create_ip_pool<S: Stream>(
    session: &mut Session<S>,
    name: &str,
    ranges: &str,
    extra: &AttributeMap,
) -> Result<Response> {
    let attributes = merge(&[("name", name), ("ranges", ranges)], extra);
    run(session, paths::IP_POOL_ADD, &attributes).await
}

/// Add a VLAN interface on `parent`.
pub async fn create_vlan_interface<S: Stream>(
    session: &mut Session<S>,
    name: &str,
    vlan_id: u16,
    parent: &str,
) -> Result<Response> {
    let vlan_id = vlan_id.to_string();
    session
        .execute(
            paths::VLAN_ADD,
            &[("name", name), ("vlan-id", vlan_id.as_str()), ("interface", parent)],
        )
        .await
}

/// Add a PPPoE server with PAP authentication and one session per host.
pub async fn create_pppoe_server<S: Stream>(
    session: &mut Session<S>,
    service_name: &str,
    interface: &str,
    default_profile: Option<&str>,
) -> Result<Response> {
    session
        .execute(
            paths::PPPOE_SERVER_ADD,
            &[
                ("service-name", service_name),
                ("interface", interface),
                ("one-session-per-host", "yes"),
                ("disabled", "no"),
                ("authentication", "pap"),
                ("default-profile", default_profile.unwrap_or(DEFAULT_PPPOE_PROFILE)),
            ],
        )
        .await
}

/// Find the `.id` of the first secret named `name`.
pub async fn find_ppp_secret_id<S: Stream>(session: &mut Session<S>, name: &str) -> Result<String> {
    list_ppp_secrets(session)
        .await?
        .into_iter()
        .find(|row| row.get("name").map(String::as_str) == Some(name))
        .and_then(|mut row| row.remove(".id"))
        .ok_or_else(|| RouterOsError::NotFound {
            what: "secret",
            name: name.to_string(),
        })
}

/// Enable the secret named `name`.
pub async fn enable_ppp_secret<S: Stream>(
    session: &mut Session<S>,
    name: &str,
) -> Result<Response> {
    by_secret_id(session, paths::PPP_SECRET_ENABLE, name).await
}

/// Disable the secret named `name`.
pub async fn disable_ppp_secret<S: Stream>(
    session: &mut Session<S>,
    name: &str,
) -> Result<Response> {
    by_secret_id(session, paths::PPP_SECRET_DISABLE, name).await
}

/// Remove the secret named `name`.
pub async fn remove_ppp_secret<S: Stream>(
    session: &mut Session<S>,
    name: &str,
) -> Result<Response> {
    by_secret_id(session, paths::PPP_SECRET_REMOVE, name).await
}

/// First host address of the /24 a range starts in.
///
/// ```
/// use routeros_client::ops::first_network_ip;
///
/// assert_eq!(first_network_ip("10.20.30.40-10.20.30.99").unwrap(), "10.20.30.1");
/// assert!(first_network_ip("10.20.30.40").is_err());
/// ```
pub fn first_network_ip(range: &str) -> Result<String> {
    let invalid = || RouterOsError::Config(format!("invalid IP range '{range}'"));

    let mut ends = range.split('-');
    let (Some(start), Some(_), None) = (ends.next(), ends.next(), ends.next()) else {
        return Err(invalid());
    };

    let octets: Vec<&str> = start.trim().split('.').collect();
    if octets.len() != 4 || octets.iter().any(|o| o.is_empty()) {
        return Err(invalid());
    }
    Ok(format!("{}.{}.{}.1", octets[0], octets[1], octets[2]))
}

async fn list<S: Stream>(session: &mut Session<S>, path: &str) -> Result<Vec<AttributeMap>> {
    let response = session.execute(path, &[]).await?;
    Ok(response.records())
}

async fn run<S: Stream>(
    session: &mut Session<S>,
    path: &str,
    attributes: &[(String, String)],
) -> Result<Response> {
    let borrowed: Vec<(&str, &str)> = attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    session.execute(path, &borrowed).await
}

async fn by_secret_id<S: Stream>(
    session: &mut Session<S>,
    path: &str,
    name: &str,
) -> Result<Response> {
    let id = find_ppp_secret_id(session, name).await?;
    tracing::debug!(path, name, %id, "secret resolved");
    session.execute(path, &[(".id", id.as_str())]).await
}

/// Base attributes in order, values replaced by `extra` on collision, then
/// the remaining `extra` keys.
fn merge(base: &[(&str, &str)], extra: &AttributeMap) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .map(|&(k, v)| {
            let value = extra.get(k).map(String::as_str).unwrap_or(v);
            (k.to_string(), value.to_string())
        })
        .collect();
    merged.extend(
        extra
            .iter()
            .filter(|(k, _)| !base.iter().any(|(b, _)| *b == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    merged
}
