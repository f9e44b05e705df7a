//! Stored-name generation.

use std::path::Path;

use rand::RngCore;

/// Random bytes per generated name (rendered as twice as many hex digits).
pub const NAME_BYTES: usize = 16;

/// Produces collision-resistant names for stored files.
///
/// Names are drawn from the thread-local CSPRNG and are treated as unique:
/// there is no existence check and no retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameGenerator;

impl NameGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a name, keeping the extension of `declared_name` if it has one.
    pub fn generate(&self, declared_name: &str) -> String {
        let mut bytes = [0u8; NAME_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        let mut name = hex::encode(bytes);
        if let Some(ext) = extract_extension(declared_name) {
            name.push('.');
            name.push_str(ext);
        }
        name
    }
}

fn extract_extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
}
