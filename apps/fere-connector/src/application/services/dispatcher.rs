//! Response Dispatcher
//!
//! Decodes inbound frames as JSON. The backend does not promise a schema,
//! so any valid JSON value is accepted as-is.
//!
//! A frame that fails to decode yields a [`DecodeFailure`] carrying the raw
//! payload and the parse error. The session keeps running: heartbeats and
//! control frames may be interleaved with data frames.

use std::fmt;

use serde_json::Value;

use crate::application::ports::InboundFrame;

/// Characters of raw payload shown in log lines and `Display`.
const PREVIEW_CHARS: usize = 80;

/// A frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    /// The offending payload. Binary frames that are not UTF-8 are
    /// converted lossily.
    pub raw: String,
    /// Parse error message.
    pub error: String,
}

impl DecodeFailure {
    /// Truncated payload for logging.
    #[must_use]
    pub fn preview(&self) -> String {
        let mut preview: String = self.raw.chars().take(PREVIEW_CHARS).collect();
        if self.raw.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode frame ({}): {}", self.error, self.preview())
    }
}

impl std::error::Error for DecodeFailure {}

/// JSON decoder for inbound frames.
#[derive(Debug, Default, Clone)]
pub struct ResponseDispatcher;

impl ResponseDispatcher {
    /// Create a new dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound frame.
    ///
    /// # Errors
    ///
    /// Returns a `DecodeFailure` if the frame is not valid JSON, or is a
    /// binary frame that is not UTF-8.
    pub fn on_frame(&self, frame: InboundFrame) -> Result<Value, DecodeFailure> {
        let text = match frame {
            InboundFrame::Text(text) => text,
            InboundFrame::Binary(data) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => {
                    let error = e.utf8_error().to_string();
                    return Err(DecodeFailure {
                        raw: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                        error,
                    });
                }
            },
        };

        serde_json::from_str(&text).map_err(|e| DecodeFailure {
            raw: text,
            error: e.to_string(),
        })
    }
}
