//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Kinship CORE.
//!
//! These bound every traversal and retry loop the engine runs. They are
//! compiled into the binary; `EngineConfig` may lower them but never exceed
//! the caps.

/// Default depth of the suggestion traversal.
///
/// - Depth 0 is the start profile itself.
/// - Profiles more than this many edges apart are never suggested to each other.
pub const DEFAULT_SUGGESTION_DEPTH: usize = 3;

/// Hard cap on the suggestion traversal depth.
///
/// Requests above the cap are clamped.
pub const MAX_SUGGESTION_DEPTH: usize = 10;

/// Default number of attempts for a transplant unit of work.
pub const DEFAULT_TRANSPLANT_ATTEMPTS: u32 = 3;

/// Hard cap on transplant attempts.
pub const MAX_TRANSPLANT_ATTEMPTS: u32 = 16;

/// Number of attempts for ordinary relationship mutations that hit a conflict.
pub const MUTATION_ATTEMPTS: u32 = 3;

/// Magic bytes for the binary snapshot header.
///
/// - File Header = Magic Bytes ("KINS") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"KINS";

/// Upper bound on a binary snapshot payload, checked before decoding.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const SNAPSHOT_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_within_caps() {
        assert!(DEFAULT_SUGGESTION_DEPTH <= MAX_SUGGESTION_DEPTH);
        assert!(DEFAULT_TRANSPLANT_ATTEMPTS <= MAX_TRANSPLANT_ATTEMPTS);
        assert!(DEFAULT_TRANSPLANT_ATTEMPTS >= 1);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"KINS");
    }
}
