/// Configures HTTP behavior of a [`crate::Database`].
///
/// This layer performs no retries: a transport failure propagates to the
/// caller immediately. Timeout and cancellation beyond the per-request
/// deadline are the transport's concern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}
