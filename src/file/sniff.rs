//! Media-type sniffing and allow-list validation.

use crate::{Result, ServiceError};

/// Number of leading bytes inspected when detecting a media type.
pub const SNIFF_LEN: usize = 512;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Detects a byte stream's media type and checks it against an allow-list.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    allowed: Vec<String>,
}

impl ContentValidator {
    /// Create a validator accepting exactly the given media types.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Media types this validator accepts.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Detect the media type of `prefix`, looking at most at [`SNIFF_LEN`] bytes.
    ///
    /// Magic-number signatures win. Without one, data free of binary control
    /// bytes is reported as UTF-8 text and anything else as
    /// `application/octet-stream`.
    pub fn detect(prefix: &[u8]) -> String {
        let prefix = &prefix[..prefix.len().min(SNIFF_LEN)];

        if let Some(kind) = infer::get(prefix) {
            return kind.mime_type().to_string();
        }

        if prefix.iter().any(|&b| is_binary_byte(b)) {
            OCTET_STREAM.to_string()
        } else {
            TEXT_PLAIN.to_string()
        }
    }

    /// Whether `media_type` is on the allow-list.
    pub fn is_allowed(&self, media_type: &str) -> bool {
        self.allowed.iter().any(|t| t == media_type)
    }

    /// Detect the media type of `prefix` and reject it unless allowed.
    pub fn validate(&self, prefix: &[u8]) -> Result<String> {
        let media_type = Self::detect(prefix);
        if self.is_allowed(&media_type) {
            Ok(media_type)
        } else {
            Err(ServiceError::Validation(format!(
                "file type not allowed: {media_type}"
            )))
        }
    }
}

/// Control bytes that never appear in plain text.
fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
