//! A reference transport adapter: a plain (non-TLS) HTTP/1.1 listener.
//!
//! §1 puts "TLS socket setup and HTTP/2 framing" out of scope, consumed
//! only through this crate's interfaces; a faithful HTTP/1.1/2+TLS stack
//! is exactly the kind of wire-protocol work a production deployment
//! swaps in its own adapter for (a `hyper`/`rustls` stack, say). What
//! lives here is the minimum line-oriented HTTP/1.1 decode needed to
//! demonstrate the adapter contract end to end: accept a connection,
//! bypass `/health`/`/ready` (§4.6), decode everything else into an
//! [`HttpRequest`], hand it to the pipeline as an [`Operation`], and
//! serialize whatever response the operation completes with back onto
//! the wire.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pel_core::http::{Headers, HttpBody, HttpRequest, HttpResponse, HttpVersion, Method};
use pel_core::Operation;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::channel_source::ChannelSourceHandle;
use crate::health;
use crate::ready::ReadyFlag;

#[derive(Debug, thiserror::Error)]
pub enum TcpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(#[from] pel_core::http::UnknownMethod),
}

/// Owns the listening socket and the ready flag the bypass endpoints
/// consult. Operations are handed off to `source` (the writable half of a
/// [`crate::channel_source::ChannelSource`] already wired into a
/// [`pel_pipeline::Pipeline`] via `add_source`).
pub struct TcpAdapter {
    ready: ReadyFlag,
    source: ChannelSourceHandle,
    request_timeout: Duration,
}

impl TcpAdapter {
    pub fn new(source: ChannelSourceHandle, ready: ReadyFlag, request_timeout: Duration) -> Self {
        TcpAdapter { ready, source, request_timeout }
    }

    pub fn ready_flag(&self) -> ReadyFlag {
        self.ready.clone()
    }

    /// Accept connections until `addr` can't be bound. Each connection is
    /// handled on its own task so a slow client can't stall others;
    /// per-connection errors are logged and dropped rather than bringing
    /// down the listener.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "tcp adapter listening");
        loop {
            let (stream, peer) = listener.accept().await?;
            let adapter = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = adapter.handle_connection(stream).await {
                    tracing::debug!(%peer, error = %err, "connection ended with an error");
                }
            });
        }
    }

    async fn handle_connection(&self, stream: TcpStream) -> Result<(), TcpError> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let (method, target) = match read_request_line(&mut reader).await? {
            Some(parts) => parts,
            None => return Ok(()), // peer closed before sending anything
        };
        let headers = read_headers(&mut reader).await?;

        if let Some(response) = health::try_handle(method, target.split('?').next().unwrap_or(target.as_str()), &self.ready) {
            write_response(&mut write_half, &response).await?;
            return Ok(());
        }

        let content_length: usize = headers
            .get_first("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let body = if content_length > 0 {
            let mut buf = vec![0u8; content_length];
            reader.read_exact(&mut buf).await?;
            let media_type = headers
                .get_first("content-type")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(pel_core::http::MediaType::json);
            Some(HttpBody::from_bytes(media_type, Bytes::from(buf)))
        } else {
            None
        };

        let request = HttpRequest::new(uuid::Uuid::new_v4(), method, &target, headers, HttpVersion::Http11, body);
        let operation = Operation::new(request);
        operation.arm_timeout(self.request_timeout);

        // Subscribe before handing the operation off so the `Response`
        // event can't fire (and be missed) between dispatch and here.
        let mut events = operation.subscribe();

        if self.source.push(operation.clone()).await.is_err() {
            tracing::warn!("pipeline source closed; failing operation before dispatch");
            operation.fail(Some(pel_core::Error::unknown("pipeline source closed")));
        }

        // Wait only for the response to be bound (or the operation to
        // terminate without one), not for full completion: a response
        // with a body stays in WRITING until this adapter drains it onto
        // the wire and reports back via `mark_response_drained`.
        loop {
            match events.recv().await {
                Ok(pel_core::OperationEvent::Response) => break,
                Ok(pel_core::OperationEvent::Finished) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }

        match operation.response() {
            Some(response) => {
                write_response(&mut write_half, &response).await?;
                if response.body.is_some() {
                    operation.mark_response_drained();
                }
            }
            None => {
                let response = error_response(operation.error());
                write_response(&mut write_half, &response).await?;
            }
        }
        Ok(())
    }
}

fn error_response(error: Option<pel_core::Error>) -> HttpResponse {
    let status = error.as_ref().map(|e| e.to_wire_status()).unwrap_or(pel_core::http::StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::new(status)
}

async fn read_request_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<Option<(Method, String)>, TcpError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    let line = line.trim_end();
    let mut parts = line.split(' ');
    let method = parts.next().ok_or_else(|| TcpError::MalformedRequestLine(line.to_string()))?;
    let target = parts.next().ok_or_else(|| TcpError::MalformedRequestLine(line.to_string()))?;
    let method: Method = method.parse()?;
    Ok(Some((method, target.to_string())))
}

async fn read_headers<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<Headers, TcpError> {
    let mut headers = Headers::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line.trim_end().is_empty() {
            break;
        }
        if let Some((name, value)) = line.trim_end().split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }
    Ok(headers)
}

async fn write_response<W: AsyncWriteExt + Unpin>(writer: &mut W, response: &HttpResponse) -> Result<(), TcpError> {
    let reason = response.message.clone().unwrap_or_else(|| default_reason(response.status.as_u16()).to_string());
    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status.as_u16(), reason);
    for (name, value) in response.headers.iter() {
        for v in value.values() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(v);
            out.push_str("\r\n");
        }
    }

    let body_bytes = match &response.body {
        Some(body) => {
            let chunk = body.collect().await.unwrap_or_default();
            out.push_str(&format!("content-type: {}\r\n", body.media_type()));
            Some(chunk)
        }
        None => None,
    };
    let len = body_bytes.as_ref().map(|b| b.len()).unwrap_or(0);
    out.push_str(&format!("content-length: {len}\r\n\r\n"));

    writer.write_all(out.as_bytes()).await?;
    if let Some(bytes) = body_bytes {
        writer.write_all(&bytes).await?;
    }
    writer.flush().await?;
    Ok(())
}

fn default_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        202 => "Accepted",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}
