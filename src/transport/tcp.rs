//! TCP transport with a connect-phase timeout.
//!
//! # Example
//!
//! ```ignore
//! use routeros_client::transport::{connect, DEFAULT_API_PORT, DEFAULT_CONNECT_TIMEOUT};
//!
//! let stream = connect("192.168.88.1", DEFAULT_API_PORT, DEFAULT_CONNECT_TIMEOUT).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Result, RouterOsError};

/// Plain-text API port.
pub const DEFAULT_API_PORT: u16 = 8728;

/// Default time allowed for the TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A byte stream a session can run over.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// Format `host:port`, bracketing bare IPv6 literals.
pub fn socket_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Open a TCP connection, giving up after `timeout`.
///
/// There is no timeout on later reads or writes.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = socket_addr(host, port);
    tracing::debug!(%addr, ?timeout, "connecting");

    let stream = with_connect_timeout(&addr, timeout, TcpStream::connect(addr.as_str())).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn with_connect_timeout<T, F>(addr: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => {
            tracing::debug!(%addr, error = %e, "connect failed");
            Err(RouterOsError::Io(e))
        }
        Err(_) => Err(RouterOsError::ConnectTimeout {
            addr: addr.to_string(),
            timeout,
        }),
    }
}
