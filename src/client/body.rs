//! Streamed JSON request bodies.
//!
//! The value is serialized on a blocking task into a bounded channel whose receiving end is
//! the request body, so encoding and transmission overlap and memory stays bounded by the
//! channel depth.

// std
use std::io::{self, BufWriter, Write};
// crates.io
use reqwest::Body;
use tokio::{sync::mpsc, task::JoinHandle};
// self
use crate::_prelude::*;

const CHUNK_CAPACITY: usize = 8 * 1024;
const CHANNEL_DEPTH: usize = 4;

type Chunk = io::Result<Bytes>;

/// Handle to the encoder feeding a [`Body`].
pub(crate) struct Encoder(JoinHandle<Result<(), serde_json::Error>>);
impl Encoder {
	/// Waits for the encoder; `Ok` when the value was fully written or the request side hung up.
	pub(crate) async fn finish(self) -> Result<()> {
		match self.0.await {
			Ok(Ok(())) => Ok(()),
			// The receiver went away; the transport error carries the real cause.
			Ok(Err(e)) if e.is_io() => Ok(()),
			Ok(Err(e)) => Err(Error::Encode(e)),
			Err(e) => Err(Error::Encode(serde_json::Error::io(io::Error::other(e)))),
		}
	}
}

/// Starts encoding `value` and returns the body reading from the encoder.
pub(crate) fn json_body<B>(value: B) -> (Body, Encoder)
where
	B: 'static + Send + Serialize,
{
	let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
	let encoder = tokio::task::spawn_blocking(move || {
		let mut writer = BufWriter::with_capacity(CHUNK_CAPACITY, ChannelWriter { tx: tx.clone() });
		let result = serde_json::to_writer(&mut writer, &value)
			.and_then(|()| writer.flush().map_err(serde_json::Error::io));

		if result.is_err() {
			// Fail the body stream so the request is not sent truncated.
			let _ = tx.blocking_send(Err(io::Error::other("request body encoding failed")));
		}

		result
	});
	let stream =
		futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) });

	(Body::wrap_stream(stream), Encoder(encoder))
}

struct ChannelWriter {
	tx: mpsc::Sender<Chunk>,
}
impl Write for ChannelWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.tx.blocking_send(Ok(Bytes::copy_from_slice(buf))).map_err(|_| {
			io::Error::new(io::ErrorKind::BrokenPipe, "request body receiver dropped")
		})?;

		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde::ser::Error as _;
	// self
	use super::*;

	struct Unencodable;
	impl Serialize for Unencodable {
		fn serialize<S>(&self, _: S) -> Result<S::Ok, S::Error>
		where
			S: serde::Serializer,
		{
			Err(S::Error::custom("value refuses to serialize"))
		}
	}

	#[tokio::test]
	async fn serializer_failure_surfaces_as_encode_error() {
		let (body, encoder) = json_body(Unencodable);

		drop(body);

		assert!(matches!(encoder.finish().await, Err(Error::Encode(_))));
	}

	#[tokio::test]
	async fn dropped_request_is_not_an_encode_error() {
		let payload = vec!["x".repeat(1024); 1024];
		let (body, encoder) = json_body(payload);

		drop(body);

		encoder.finish().await.expect("A vanished receiver should defer to the transport error.");
	}
}
