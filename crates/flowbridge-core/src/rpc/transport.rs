//! Newline-delimited JSON-RPC over any async byte stream.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::connection::ConnectionGuard;
use super::router::RpcRouter;

/// Serve one connection: one request per line, one response line per
/// request that expects one.
///
/// Returns when the reader hits EOF, on a read or write error, or when the
/// state's shutdown token is cancelled. Malformed lines, including lines
/// that are not valid UTF-8, are answered with JSON-RPC errors and never
/// end the loop.
pub async fn serve_lines<R, W>(
    router: &RpcRouter,
    mut reader: R,
    mut writer: W,
    guard: &ConnectionGuard,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let shutdown = router.state().shutdown.clone();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            break;
        }

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        guard.record_request();
        if let Some(response) = router.handle_bytes(line).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    tracing::debug!(connection = guard.id(), "line transport finished");
    Ok(())
}
