//! Shared constants for end-to-end tests
//!
//! When test data changes (song titles, owners, limits), update only this file.

// ============================================================================
// Songs
// ============================================================================

pub const TEXT_SONG_TITLE: &str = "Yesterday";
pub const TEXT_SONG_ARTIST: &str = "The Beatles";

/// Returned by [`super::RecordingIdentifier`] when it is set to match.
pub const IDENTIFIED_TITLE: &str = "Bohemian Rhapsody";
pub const IDENTIFIED_ARTIST: &str = "Queen";
pub const IDENTIFIED_ALBUM: &str = "A Night at the Opera";

// ============================================================================
// Library
// ============================================================================

/// Default owner configured on every test server.
pub const DEFAULT_OWNER: &str = "test-owner";

pub const OTHER_OWNER: &str = "someone-else";

/// Well-formed id that no test ever creates.
pub const UNKNOWN_ENTRY_ID: &str = "0123456789abcdef01234567";

// ============================================================================
// Limits and timing
// ============================================================================

/// Upload limit configured on test servers, in bytes.
pub const TEST_MAX_UPLOAD_BYTES: u64 = 64 * 1024;

/// Total time to wait for a spawned server to answer /health.
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness probes.
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test client.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
