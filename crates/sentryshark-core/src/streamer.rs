//! Lazy, finite sequence of decoded packets read from a capture in file
//! order. Per-packet decode failures are skipped with a logged warning;
//! the capture-open failure itself is fatal (see [`crate::error`]).

use crate::error::SourceOpenError;
use crate::packet::{Packet, decode_packet};
use crate::source::PacketSource;

pub struct PacketStreamer<S: PacketSource> {
    source: S,
}

impl<S: PacketSource> PacketStreamer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Pulls the next successfully decoded packet, or `None` at end of
    /// stream. A packet whose bytes cannot be decoded is logged at WARN and
    /// skipped in favor of the next one; it never terminates the stream.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, SourceOpenError> {
        loop {
            let event = match self.source.next_packet()? {
                Some(event) => event,
                None => return Ok(None),
            };
            match decode_packet(&event) {
                Ok(packet) => return Ok(Some(packet)),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping packet that failed to decode");
                    continue;
                }
            }
        }
    }
}
