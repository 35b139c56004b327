use bytes::BytesMut;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::api::json::message::LedResponse;

/// Longest request line accepted from a client
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum JsonCodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Lines(#[from] LinesCodecError),
    #[error("error encoding response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A decoded request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFrame {
    Line(String),
    /// A line longer than [MAX_LINE_LENGTH]. Its bytes are skipped up to the next newline.
    Oversized,
}

fn frame(
    result: Result<Option<String>, LinesCodecError>,
) -> Result<Option<JsonFrame>, JsonCodecError> {
    match result {
        Ok(line) => Ok(line.map(JsonFrame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(JsonFrame::Oversized)),
        Err(LinesCodecError::Io(error)) => Err(error.into()),
    }
}

/// Line-delimited JSON codec
///
/// Requests are decoded as raw lines: parsing happens in the API layer so that a malformed
/// request gets an error response instead of ending the stream. Overlong lines are reported as
/// [JsonFrame::Oversized] for the same reason.
pub struct JsonCodec {
    lines: LinesCodec,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonCodec {
    type Item = JsonFrame;
    type Error = JsonCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        frame(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        frame(self.lines.decode_eof(src))
    }
}

impl Encoder<LedResponse> for JsonCodec {
    type Error = JsonCodecError;

    fn encode(&mut self, item: LedResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = serde_json::to_string(&item)?;
        Ok(self.lines.encode(encoded, dst)?)
    }
}
