//! One-shot facade over a device.
//!
//! Every [`Router`] method opens a fresh TCP session, logs in with the
//! configured credentials, runs a single operation and disconnects. Failures
//! are reported as an [`OperationError`]: a kind, a message and a remediation
//! hint, ready to show to an operator or serialize.

use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{ErrorKind, Result, RouterOsError};
use crate::ops;
use crate::protocol::{AttributeMap, Response};
use crate::seed::{self, RecordSource, SeedColumns, SeedSummary};
use crate::session::Session;

/// Result type for [`Router`] methods.
pub type OpResult<T> = std::result::Result<T, OperationError>;

/// A reportable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    /// Failure class.
    pub kind: ErrorKind,
    /// What went wrong.
    pub message: String,
    /// What the operator can check.
    pub hint: String,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.hint)
    }
}

impl std::error::Error for OperationError {}

impl From<RouterOsError> for OperationError {
    fn from(e: RouterOsError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            hint: e.hint().to_string(),
        }
    }
}

/// Connection settings for one device, used for every call.
#[derive(Debug, Clone)]
pub struct Router {
    config: SessionConfig,
}

impl Router {
    /// Create a facade; nothing connects until a method is called.
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Connection settings used for every call.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// List interfaces.
    pub async fn list_interfaces(&self) -> OpResult<Vec<AttributeMap>> {
        let mut session = self.open().await?;
        let result = ops::list_interfaces(&mut session).await;
        finish(session, result).await
    }

    /// List PPP profiles.
    pub async fn list_ppp_profiles(&self) -> OpResult<Vec<AttributeMap>> {
        let mut session = self.open().await?;
        let result = ops::list_ppp_profiles(&mut session).await;
        finish(session, result).await
    }

    /// List PPP secrets.
    pub async fn list_ppp_secrets(&self) -> OpResult<Vec<AttributeMap>> {
        let mut session = self.open().await?;
        let result = ops::list_ppp_secrets(&mut session).await;
        finish(session, result).await
    }

    /// List IP pools.
    pub async fn list_ip_pools(&self) -> OpResult<Vec<AttributeMap>> {
        let mut session = self.open().await?;
        let result = ops::list_ip_pools(&mut session).await;
        finish(session, result).await
    }

    /// Add a PPP secret; `extra` overrides `name`/`password`.
    pub async fn create_ppp_secret(
        &self,
        name: &str,
        password: &str,
        extra: &AttributeMap,
    ) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::create_ppp_secret(&mut session, name, password, extra).await;
        finish(session, result).await
    }

    /// Add a PPP profile.
    pub async fn create_ppp_profile(&self, name: &str, extra: &AttributeMap) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::create_ppp_profile(&mut session, name, extra).await;
        finish(session, result).await
    }

    /// Add an IP pool.
    pub async fn create_ip_pool(
        &self,
        name: &str,
        ranges: &str,
        extra: &AttributeMap,
    ) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::create_ip_pool(&mut session, name, ranges, extra).await;
        finish(session, result).await
    }

    /// Add a VLAN interface on `parent`.
    pub async fn create_vlan_interface(
        &self,
        name: &str,
        vlan_id: u16,
        parent: &str,
    ) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::create_vlan_interface(&mut session, name, vlan_id, parent).await;
        finish(session, result).await
    }

    /// Add a PPPoE server (`default` profile when `None`).
    pub async fn create_pppoe_server(
        &self,
        service_name: &str,
        interface: &str,
        default_profile: Option<&str>,
    ) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result =
            ops::create_pppoe_server(&mut session, service_name, interface, default_profile).await;
        finish(session, result).await
    }

    /// Find the `.id` of the secret named `name`.
    pub async fn find_ppp_secret_id(&self, name: &str) -> OpResult<String> {
        let mut session = self.open().await?;
        let result = ops::find_ppp_secret_id(&mut session, name).await;
        finish(session, result).await
    }

    /// Enable the secret named `name`.
    pub async fn enable_ppp_secret(&self, name: &str) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::enable_ppp_secret(&mut session, name).await;
        finish(session, result).await
    }

    /// Disable the secret named `name`.
    pub async fn disable_ppp_secret(&self, name: &str) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::disable_ppp_secret(&mut session, name).await;
        finish(session, result).await
    }

    /// Remove the secret named `name`.
    pub async fn remove_ppp_secret(&self, name: &str) -> OpResult<Response> {
        let mut session = self.open().await?;
        let result = ops::remove_ppp_secret(&mut session, name).await;
        finish(session, result).await
    }

    /// Seed PPP secrets over a single session.
    ///
    /// Records are loaded before connecting, so a bad source never dials.
    pub async fn seed_ppp_secrets<R>(
        &self,
        source: &R,
        columns: &SeedColumns,
    ) -> OpResult<SeedSummary>
    where
        R: RecordSource + ?Sized,
    {
        let records = source.records()?;
        let mut session = self.open().await?;
        let result = seed::seed_records(&mut session, &records, columns).await;
        finish(session, result).await
    }

    async fn open(&self) -> OpResult<Session> {
        Session::open(self.config.clone()).await.map_err(|e| {
            tracing::warn!(host = %self.config.host, error = %e, "could not open session");
            OperationError::from(e)
        })
    }
}

async fn finish<T>(mut session: Session, result: Result<T>) -> OpResult<T> {
    session.disconnect().await;
    result.map_err(OperationError::from)
}
