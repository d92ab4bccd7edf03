//! Concurrent request loop.
//!
//! Each request line is handled on its own task, so a slow compile does not
//! hold up the lines behind it. Responses are written in completion order.

use std::io;

use onload_loader::Interceptor;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

use crate::handler;
use crate::wire::Reply;

/// Serve request lines from `reader` until it closes and every in-flight
/// request has been answered.
pub async fn serve<R, W>(interceptor: &'static Interceptor, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight = JoinSet::new();
    let mut reading = true;

    while reading || !in_flight.is_empty() {
        tokio::select! {
            line = lines.next_line(), if reading => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    in_flight.spawn(async move { handler::respond(interceptor, &line).await });
                }
                None => reading = false,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                Ok(reply) => write_reply(&mut writer, &reply).await?,
                Err(e) => tracing::error!(error = %e, "request task failed"),
            },
        }
    }

    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &Reply) -> io::Result<()> {
    let mut encoded = serde_json::to_vec(reply)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await
}
