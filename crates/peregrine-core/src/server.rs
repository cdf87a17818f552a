//! Connection glue over the Tokio substrate.
//!
//! The core itself only consumes byte buffers ([`Dispatcher::dispatch`]);
//! this module supplies the bundled serving loop: accept, read until a full
//! message parses, write the response bytes, close. [`serve_connection`] is
//! generic over the stream type, so any already-open duplex byte stream can
//! be driven through the dispatcher without the bundled listener.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::response::Response;

/// Cap on total bytes buffered for one request before answering 413.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// The bundled TCP server.
pub struct Server {
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Bind `addr` and serve until the task is dropped.
    pub async fn run(self, addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        info!("peregrine listening on http://{}", listener.local_addr()?);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(dispatcher, stream).await {
                    debug!(remote = %remote_addr, error = %err, "connection error");
                }
            });
        }
    }
}

/// Serve one request on an already-open connection, then close it.
///
/// Reads are accumulated until the dispatcher reports a complete message;
/// a peer that closes mid-message gets no response. One response per
/// connection: the write side is shut down after the response bytes.
pub async fn serve_connection<S>(dispatcher: Arc<Dispatcher>, mut stream: S) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if buf.len() > MAX_REQUEST_BYTES {
            stream
                .write_all(&Response::payload_too_large().to_bytes())
                .await?;
            stream.shutdown().await?;
            return Ok(());
        }

        match dispatcher.dispatch(&buf) {
            DispatchOutcome::Response(bytes) => {
                stream.write_all(&bytes).await?;
                stream.shutdown().await?;
                return Ok(());
            }
            DispatchOutcome::NeedMoreData => continue,
        }
    }
}
