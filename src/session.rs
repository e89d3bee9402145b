//! Session builder and command dispatch.
//!
//! The [`SessionBuilder`] provides a fluent API for configuring a device
//! connection. The [`Session`] owns the transport and sequences its lifecycle:
//! 1. Connect (`Disconnected → Connected`)
//! 2. Log in with plain-text credentials (`Connected → Authenticated`)
//! 3. Dispatch commands, one at a time
//! 4. Disconnect (any state `→ Disconnected`)
//!
//! # Example
//!
//! ```ignore
//! use routeros_client::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::builder("192.168.88.1")
//!         .credentials("admin", "secret")
//!         .connect()
//!         .await?;
//!     session.login("admin", "secret").await?;
//!
//!     let response = session.send_command("/interface/print", &[]).await?;
//!     for row in response.records() {
//!         println!("{}", row["name"]);
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::SessionConfig;
use crate::error::{ErrorKind, Result, RouterOsError};
use crate::protocol::{attribute_word, Response, Sentence, Termination};
use crate::transport::{self, Stream};
use crate::wire::{encode_sentence, write_batch, OutboundWord, WordReader};

/// Login command path.
pub const LOGIN_COMMAND: &str = "/login";

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport.
    Disconnected,
    /// Transport open, not logged in.
    Connected,
    /// Logged in.
    Authenticated,
}

impl SessionState {
    /// Lower-case state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for configuring and connecting a session.
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder for `host` with default settings.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SessionConfig::new(host),
        }
    }

    /// Start from an existing config.
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Set the API port.
    ///
    /// Default: 8728
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the login name and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Set the TCP connect timeout.
    ///
    /// Default: 5 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the largest word accepted from the device.
    ///
    /// Default: 16 MiB
    pub fn max_word_len(mut self, max: usize) -> Self {
        self.config.max_word_len = max;
        self
    }

    /// Set which reply markers end a response.
    ///
    /// Default: [`Termination::DoneOrFatal`]
    pub fn termination(mut self, termination: Termination) -> Self {
        self.config.termination = termination;
        self
    }

    /// Finish building without connecting.
    pub fn build(self) -> SessionConfig {
        self.config
    }

    /// Build and connect. The session is `Connected`, not yet logged in.
    pub async fn connect(self) -> Result<Session> {
        let mut session = Session::new(self.config);
        session.connect().await?;
        Ok(session)
    }
}

/// A session with one device.
///
/// Commands take `&mut self`, so at most one command is in flight.
pub struct Session<S = TcpStream> {
    config: SessionConfig,
    stream: Option<BufReader<S>>,
    state: SessionState,
}

impl Session<TcpStream> {
    /// Create a session builder for `host`.
    pub fn builder(host: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(host)
    }

    /// Create a disconnected session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stream: None,
            state: SessionState::Disconnected,
        }
    }

    /// Open the TCP connection: `Disconnected → Connected`.
    pub async fn connect(&mut self) -> Result<()> {
        self.require(&[SessionState::Disconnected], "disconnected")?;
        self.config.validate()?;

        let stream = transport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
        )
        .await?;

        self.stream = Some(BufReader::new(stream));
        self.state = SessionState::Connected;
        tracing::debug!(host = %self.config.host, port = self.config.port, "session connected");
        Ok(())
    }

    /// Connect and log in with the configured credentials.
    ///
    /// On login failure the connection is closed before the error is returned.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.connect().await?;
        if let Err(e) = session.authenticate().await {
            session.disconnect().await;
            return Err(e);
        }
        Ok(session)
    }
}

impl<S: Stream> Session<S> {
    /// Wrap an already-open stream; the session starts `Connected`.
    pub fn from_stream(stream: S, config: SessionConfig) -> Self {
        Self {
            config,
            stream: Some(BufReader::new(stream)),
            state: SessionState::Connected,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check if the transport is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    /// Check if login succeeded.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Log in with the credentials from the session config.
    pub async fn authenticate(&mut self) -> Result<()> {
        let username = self.config.username.clone();
        let password = self.config.password.clone();
        self.login(&username, &password).await
    }

    /// Log in with plain-text credentials: `Connected → Authenticated`.
    ///
    /// Success requires the first reply sentence to be `!done`. On any other
    /// reply the session stays `Connected` and [`RouterOsError::Auth`] carries
    /// the raw reply. Challenge-response login is not supported.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require(&[SessionState::Connected], "connected")?;

        let response = self
            .send_command(LOGIN_COMMAND, &[("name", username), ("password", password)])
            .await?;

        match response.first() {
            Some(first) if first.is_done() => {
                if first.attribute("ret").is_some() {
                    tracing::warn!(username, "device requested challenge-response login");
                    return Err(auth_error(
                        "device requested challenge-response login, which is not supported",
                        &response,
                    ));
                }
                self.state = SessionState::Authenticated;
                tracing::debug!(username, "login succeeded");
                Ok(())
            }
            first => {
                let reason = first
                    .map(login_failure_reason)
                    .unwrap_or_else(|| "empty reply".to_string());
                tracing::warn!(username, %reason, "login rejected");
                Err(auth_error(&reason, &response))
            }
        }
    }

    /// Send one command sentence and read its full response.
    ///
    /// The sentence is `[command] ++ ["=key=value" ...]`; values are not
    /// escaped. The raw response is returned even if it contains `!trap`;
    /// use [`execute`](Self::execute) to turn error replies into errors.
    ///
    /// A transport failure or malformed reply closes the session, as does a
    /// `!fatal` reply.
    pub async fn send_command(
        &mut self,
        command: &str,
        attributes: &[(&str, &str)],
    ) -> Result<Response> {
        self.require(
            &[SessionState::Connected, SessionState::Authenticated],
            "connected",
        )?;

        let mut words = Vec::with_capacity(attributes.len() + 1);
        words.push(command.to_string());
        words.extend(attributes.iter().map(|(k, v)| attribute_word(k, v)));

        // Nothing has been written if encoding fails, so the session stays usable.
        let batch = encode_sentence(&words)?;

        tracing::debug!(command, attributes = attributes.len(), "dispatch");

        match self.dispatch(&batch).await {
            Ok(response) => {
                if response.sentences().iter().any(Sentence::is_fatal) {
                    tracing::warn!(command, "device sent !fatal, closing session");
                    self.disconnect().await;
                } else if let Some(trap) = response.trap() {
                    tracing::warn!(
                        command,
                        reason = trap.attribute("message").as_deref().unwrap_or(""),
                        "command trapped"
                    );
                }
                Ok(response)
            }
            Err(e) => {
                if matches!(e.kind(), ErrorKind::Transport | ErrorKind::Protocol) {
                    tracing::warn!(command, error = %e, "stream unusable, closing session");
                    self.stream = None;
                    self.state = SessionState::Disconnected;
                }
                Err(e)
            }
        }
    }

    /// [`send_command`](Self::send_command), then map `!trap`/`!fatal` to errors.
    pub async fn execute(
        &mut self,
        command: &str,
        attributes: &[(&str, &str)],
    ) -> Result<Response> {
        self.send_command(command, attributes).await?.into_result()
    }

    /// Close the transport if open. Idempotent and infallible.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "shutdown failed");
            }
            tracing::debug!("session disconnected");
        }
        self.state = SessionState::Disconnected;
    }

    async fn dispatch(&mut self, batch: &[OutboundWord]) -> Result<Response> {
        let max_word_len = self.config.max_word_len;
        let termination = self.config.termination;
        let stream = self.stream.as_mut().ok_or(RouterOsError::InvalidState {
            expected: "connected",
            actual: SessionState::Disconnected.as_str(),
        })?;

        write_batch(stream, batch).await?;
        WordReader::with_max_word_len(stream, max_word_len)
            .read_response(termination)
            .await
    }

    fn require(&self, allowed: &[SessionState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(RouterOsError::InvalidState {
                expected,
                actual: self.state.as_str(),
            })
        }
    }
}

fn login_failure_reason(first: &Sentence) -> String {
    if first.is_trap() || first.is_fatal() {
        if let Some(message) = first.attribute("message") {
            return message;
        }
    }
    match first.first_word() {
        Some(word) => format!("unexpected reply '{}'", String::from_utf8_lossy(word)),
        None => "empty first sentence".to_string(),
    }
}

fn auth_error(reason: &str, response: &Response) -> RouterOsError {
    RouterOsError::Auth {
        reason: reason.to_string(),
        response: response.to_strings(),
    }
}

/// Scripted in-memory device for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::wire::write_sentence;

    /// One scripted reply: a list of sentences, each a list of words.
    pub type Reply = Vec<Vec<&'static str>>;

    /// Spawn a fake device that answers each received sentence with the next
    /// reply. Resolves to the sentences it received.
    pub fn fake_device(script: Vec<Reply>) -> (DuplexStream, JoinHandle<Vec<Sentence>>) {
        let (client, server) = duplex(64 * 1024);
        let task = tokio::spawn(async move {
            let mut reader = WordReader::new(server);
            let mut received = Vec::new();
            for reply in script {
                match reader.read_sentence().await {
                    Ok(sentence) => received.push(sentence),
                    Err(_) => break,
                }
                for sentence in reply {
                    if write_sentence(reader.get_mut(), sentence).await.is_err() {
                        return received;
                    }
                }
            }
            received
        });
        (client, task)
    }

    /// A `Connected` session over a fake device.
    pub fn session(script: Vec<Reply>) -> (Session<DuplexStream>, JoinHandle<Vec<Sentence>>) {
        let (stream, task) = fake_device(script);
        (Session::from_stream(stream, SessionConfig::new("fake")), task)
    }

    /// A `Authenticated` session over a fake device; the login reply is prepended.
    pub async fn logged_in(
        mut script: Vec<Reply>,
    ) -> (Session<DuplexStream>, JoinHandle<Vec<Sentence>>) {
        script.insert(0, vec![vec!["!done"]]);
        let (mut session, task) = session(script);
        session.login("admin", "pw").await.unwrap();
        (session, task)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let config = Session::builder("10.0.0.1")
            .port(18728)
            .credentials("api", "pw")
            .connect_timeout(Duration::from_secs(1))
            .max_word_len(1024)
            .termination(Termination::DoneOnly)
            .build();

        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 18728);
        assert_eq!(config.username, "api");
        assert_eq!(config.password, "pw");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.max_word_len, 1024);
        assert_eq!(config.termination, Termination::DoneOnly);
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new(SessionConfig::new("gw"));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_login_success() {
        let (mut session, device) = session(vec![vec![vec!["!done"]]]);
        session.login("admin", "secret").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);

        let received = device.await.unwrap();
        assert_eq!(
            received[0].to_strings(),
            vec!["/login", "=name=admin", "=password=secret"]
        );
    }

    #[tokio::test]
    async fn test_login_trap_keeps_connected() {
        let (mut session, _device) = session(vec![vec![
            vec!["!trap", "=message=invalid user name or password"],
            vec!["!done"],
        ]]);

        let err = session.login("admin", "wrong").await.unwrap_err();
        match &err {
            RouterOsError::Auth { reason, response } => {
                assert_eq!(reason, "invalid user name or password");
                assert_eq!(response.len(), 2);
                assert_eq!(response[0][0], "!trap");
            }
            other => panic!("expected auth error, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_login_bare_trap_with_any_marker_policy() {
        let (stream, _device) = fake_device(vec![vec![vec![
            "!trap",
            "=message=invalid user name or password",
        ]]]);
        let mut config = SessionConfig::new("fake");
        config.termination = Termination::AnyReplyMarker;
        let mut session = Session::from_stream(stream, config);

        let err = session.login("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, RouterOsError::Auth { .. }));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_login_challenge_rejected() {
        let (mut session, _device) =
            session(vec![vec![vec!["!done", "=ret=ebddd18303a54111e2dea05a92ab46b4"]]]);
        let err = session.login("admin", "pw").await.unwrap_err();
        assert!(err.to_string().contains("challenge-response"));
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_login_twice_is_invalid_state() {
        let (mut session, _device) = logged_in(vec![]).await;
        let err = session.login("admin", "pw").await.unwrap_err();
        assert!(matches!(
            err,
            RouterOsError::InvalidState {
                expected: "connected",
                actual: "authenticated"
            }
        ));
    }

    #[tokio::test]
    async fn test_send_command_interface_print() {
        let (mut session, device) = logged_in(vec![vec![
            vec!["!re", "=name=ether1", "=type=ether"],
            vec!["!re", "=name=ether2", "=type=ether"],
            vec!["!done"],
        ]])
        .await;

        let response = session.send_command("/interface/print", &[]).await.unwrap();
        assert_eq!(response.len(), 3);
        let records = response.records();
        assert_eq!(records[0]["name"], "ether1");
        assert_eq!(records[1]["name"], "ether2");
        assert_eq!(records[1]["type"], "ether");

        session.disconnect().await;
        let received = device.await.unwrap();
        assert_eq!(received[1].to_strings(), vec!["/interface/print"]);
    }

    #[tokio::test]
    async fn test_attribute_values_sent_verbatim() {
        let (mut session, device) = logged_in(vec![vec![vec!["!done", "=ret=*5"]]]).await;
        let response = session
            .send_command("/ip/pool/add", &[("name", "p1"), ("ranges", "10.0.0.1-10.0.0.2=x")])
            .await
            .unwrap();
        assert_eq!(response.done_ret().as_deref(), Some("*5"));

        session.disconnect().await;
        let received = device.await.unwrap();
        assert_eq!(
            received[1].to_strings(),
            vec!["/ip/pool/add", "=name=p1", "=ranges=10.0.0.1-10.0.0.2=x"]
        );
    }

    #[tokio::test]
    async fn test_execute_maps_trap() {
        let (mut session, _device) = logged_in(vec![vec![
            vec!["!trap", "=message=no such command"],
            vec!["!done"],
        ]])
        .await;
        let err = session.execute("/bogus", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            RouterOsError::Trap { ref message, .. } if message == "no such command"
        ));
        // A trap is not a transport failure.
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_fatal_disconnects() {
        let (mut session, _device) =
            logged_in(vec![vec![vec!["!fatal", "session terminated"]]]).await;
        let response = session.send_command("/system/reboot", &[]).await.unwrap();
        assert_eq!(response.len(), 1);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_transport_failure_disconnects() {
        // Device answers login, then hangs up mid-response.
        let (mut session, _device) = logged_in(vec![vec![vec!["!re", "=name=ether1"]]]).await;
        let err = session.send_command("/interface/print", &[]).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.state(), SessionState::Disconnected);

        let err = session.send_command("/interface/print", &[]).await.unwrap_err();
        assert!(matches!(err, RouterOsError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_empty_command_rejected_before_write() {
        let (mut session, device) =
            logged_in(vec![vec![vec!["!re", "=name=ether1"], vec!["!done"]]]).await;

        let err = session.send_command("", &[("name", "x")]).await.unwrap_err();
        assert!(matches!(err, RouterOsError::Protocol(_)));
        assert_eq!(session.state(), SessionState::Authenticated);

        // The next command gets its own reply.
        let response = session.send_command("/interface/print", &[]).await.unwrap();
        assert_eq!(response.records()[0]["name"], "ether1");

        session.disconnect().await;
        let received = device.await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].to_strings(), vec!["/interface/print"]);
    }

    #[tokio::test]
    async fn test_malformed_reply_disconnects() {
        let (client, mut server) = tokio::io::duplex(1024);
        let device = tokio::spawn(async move {
            let mut reader = WordReader::new(&mut server);
            reader.read_sentence().await.unwrap();
            // Reserved control byte where a length prefix is expected.
            tokio::io::AsyncWriteExt::write_all(reader.get_mut(), &[0xF8]).await.unwrap();
        });
        let mut session = Session::from_stream(client, SessionConfig::new("fake"));

        let err = session.send_command("/interface/print", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(session.state(), SessionState::Disconnected);
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (mut session, _device) = session(vec![]);
        session.disconnect().await;
        session.disconnect().await;
        assert_eq!(session.state(), SessionState::Disconnected);
    }
}
