//! One-shot loopback listener that captures the `code` parameter of an OAuth redirect.

use crate::error::{AuthError, AuthResult};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const REQUEST_BUFFER_SIZE: usize = 4096;

const SUCCESS_HTML: &str = "<html><body><h1>Authentication complete</h1><p>You can close this window and return to the app.</p></body></html>";
const MISSING_CODE_HTML: &str = "<html><body><h1>Missing code</h1><p>Close this window and try logging in again.</p></body></html>";

/// Result of a single listener invocation.
///
/// `code` and `timed_out` are never both set; `{None, false}` means a callback
/// arrived but carried no usable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectOutcome {
    pub code: Option<String>,
    pub timed_out: bool,
}

impl RedirectOutcome {
    pub fn received(code: Option<String>) -> Self {
        Self {
            code,
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            code: None,
            timed_out: true,
        }
    }

    pub fn into_code(self) -> AuthResult<String> {
        match self {
            RedirectOutcome {
                code: Some(code), ..
            } => Ok(code),
            RedirectOutcome {
                timed_out: true, ..
            } => Err(AuthError::Timeout),
            RedirectOutcome { .. } => Err(AuthError::MalformedCallback),
        }
    }
}

#[derive(Debug)]
pub struct RedirectListener {
    listener: TcpListener,
    port: u16,
}

impl RedirectListener {
    /// Binds `127.0.0.1:port` and starts listening. Port 0 picks an ephemeral port.
    ///
    /// A busy port is reported, not retried: the browser is going to redirect to
    /// exactly this port.
    pub fn bind(port: u16) -> AuthResult<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = listen_on(addr).map_err(|source| AuthError::Bind { port, source })?;
        let port = listener
            .local_addr()
            .map_err(|source| AuthError::Bind { port, source })?
            .port();
        debug!(port, "OAuth callback listener ready");
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accepts at most one connection and reads its request, both within
    /// `timeout`; answers it and releases the port.
    pub async fn await_code(self, timeout: Duration) -> AuthResult<RedirectOutcome> {
        let deadline = Instant::now() + timeout;
        let accepted = tokio::time::timeout_at(deadline, self.listener.accept()).await;
        let (mut stream, peer) = match accepted {
            Err(_) => {
                info!(port = self.port, ?timeout, "No OAuth callback before timeout");
                return Ok(RedirectOutcome::timed_out());
            }
            Ok(Err(e)) => return Err(AuthError::Accept(e)),
            Ok(Ok(conn)) => conn,
        };
        debug!(%peer, "OAuth callback connection accepted");

        let mut buffer = vec![0u8; REQUEST_BUFFER_SIZE];
        let size = match tokio::time::timeout_at(deadline, stream.read(&mut buffer)).await {
            Err(_) => {
                info!(%peer, ?timeout, "OAuth callback connection sent no request before timeout");
                return Ok(RedirectOutcome::timed_out());
            }
            Ok(Ok(size)) => size,
            Ok(Err(e)) => {
                warn!("OAuth callback read failed: {e}");
                0
            }
        };
        let request = String::from_utf8_lossy(&buffer[..size]);
        let code = extract_code(&request);

        let (status, body) = if code.is_some() {
            ("HTTP/1.1 200 OK", SUCCESS_HTML)
        } else {
            warn!("OAuth callback did not carry a code");
            ("HTTP/1.1 400 Bad Request", MISSING_CODE_HTML)
        };
        let response = format!(
            "{status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        Ok(RedirectOutcome::received(code))
    }
}

/// Binds, waits for one callback, and closes.
pub async fn await_code(port: u16, timeout: Duration) -> AuthResult<RedirectOutcome> {
    RedirectListener::bind(port)?.await_code(timeout).await
}

fn listen_on(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1)
}

/// Pulls the raw `code` query value out of a `GET <target> HTTP/x` request line.
/// The value is passed through without percent-decoding.
fn extract_code(request: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    let (_, query) = target.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("code="))
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}
