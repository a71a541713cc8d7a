//! MLLP client for exchanging messages with the registry under test
//!
//! One connection per test run, one in-flight exchange per call. A
//! timeout or framing fault leaves the stream position unknown, so the
//! client refuses further sends on that connection; reconnecting is the
//! caller's decision, never done behind its back.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};
use crate::hl7::Message;

use super::codec;

/// MLLP client bound to one TCP connection
#[derive(Debug)]
pub struct MllpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    peer: String,
    response_secs: u64,
    poisoned: bool,
}

impl MllpClient {
    /// Connect to the registry's MLLP listener
    pub async fn connect(addr: &str, timeouts: &Timeouts) -> Result<Self> {
        let connect = Duration::from_secs(timeouts.connect_secs);
        let stream = timeout(connect, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "timed out connecting to {addr} after {}s",
                    timeouts.connect_secs
                ))
            })?
            .map_err(|e| Error::Connection(format!("cannot connect to {addr}: {e}")))?;

        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();

        tracing::info!(peer = %addr, "connected to registry");

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            peer: addr.to_string(),
            response_secs: timeouts.response_secs,
            poisoned: false,
        })
    }

    /// Send one message and wait for exactly one framed response
    pub async fn send(&mut self, message: &Message) -> Result<Message> {
        if self.poisoned {
            return Err(Error::Connection(format!(
                "connection to {} is in an indeterminate state; reconnect before sending",
                self.peer
            )));
        }

        let outbound = message.to_er7();
        tracing::debug!(peer = %self.peer, "MLLP >>> {}", printable(&outbound));

        if let Err(e) = codec::write_frame(&mut self.writer, &outbound).await {
            self.poisoned = true;
            return Err(e);
        }

        let raw = match timeout(
            Duration::from_secs(self.response_secs),
            codec::read_frame(&mut self.reader),
        )
        .await
        {
            Err(_) => {
                // a late response would desynchronize the next exchange
                self.poisoned = true;
                return Err(Error::Timeout(self.response_secs));
            }
            Ok(Err(e)) => {
                self.poisoned = true;
                return Err(e);
            }
            Ok(Ok(raw)) => raw,
        };

        tracing::debug!(peer = %self.peer, "MLLP <<< {}", printable(&raw));
        Message::parse(&raw)
    }

    /// Close the connection, flushing any buffered bytes
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.writer.flush().await;
        self.writer.get_mut().shutdown().await?;
        Ok(())
    }
}

fn printable(er7: &str) -> String {
    er7.replace('\r', "\\r")
}
