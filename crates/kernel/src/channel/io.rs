use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Inbound;
use crate::Error;
use crate::wire::{Frame, read_frame, write_frame};

/// Runs the I/O loop for one kernel connection until EOF, an I/O error,
/// cancellation, or the owning [`super::ChannelSet`] going away.
pub(super) async fn run_kernel_io(
	mut reader: Box<dyn AsyncBufRead + Send + Unpin>,
	mut writer: Box<dyn AsyncWrite + Send + Unpin>,
	mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
	inbound_tx: mpsc::UnboundedSender<Inbound>,
	cancel: CancellationToken,
) {
	let mut read_buf = Vec::new();
	let mut seq = 0u64;

	let reason = loop {
		tokio::select! {
			_ = cancel.cancelled() => break "connection closed".to_owned(),

			// Outbound frames are written one at a time, in send order
			out = outbound_rx.recv() => {
				let Some(frame) = out else {
					break "channel set dropped".to_owned();
				};
				if let Err(e) = write_frame(&mut writer, &frame).await {
					tracing::error!(channel = %frame.channel, error = %e, "write to kernel failed");
					break format!("write failed: {e}");
				}
				tracing::trace!(channel = %frame.channel, "frame sent");
			}

			result = read_frame(&mut reader, &mut read_buf) => {
				match result {
					Ok(Some(frame)) => {
						tracing::trace!(seq, channel = %frame.channel, "frame received");
						if inbound_tx.send(Inbound::Frame(seq, frame)).is_err() {
							break "channel set dropped".to_owned();
						}
						seq += 1;
					}
					Ok(None) => {
						tracing::info!("kernel closed connection");
						break "kernel closed connection".to_owned();
					}
					Err(Error::Json(e)) => {
						tracing::warn!(error = %e, "discarding malformed frame");
					}
					Err(e) => {
						tracing::error!(error = %e, "read from kernel failed");
						break format!("read failed: {e}");
					}
				}
			}
		}
	};

	let _ = inbound_tx.send(Inbound::Closed(reason));
}
