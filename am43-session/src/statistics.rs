//! Link statistics collection

/// Counters for one motor link
///
/// Updated by the dispatcher and the polling engine; readable by the bridge
/// for health reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LinkStatistics {
    /// Frames handed to the transport
    pub frames_sent: u64,
    /// Notifications parsed into a reply
    pub replies_received: u64,
    /// Notifications dropped as malformed
    pub replies_dropped: u64,
    /// Replies whose trailing checksum did not match
    pub checksum_mismatches: u64,
    /// Negative acknowledgements received
    pub nacks: u64,
    /// LOGIN frames sent by the polling engine
    pub login_attempts: u64,
    /// Telemetry requests sent by the polling engine
    pub telemetry_polls: u64,
}

impl LinkStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_frames_sent(&mut self) {
        self.frames_sent += 1;
    }

    pub fn increment_replies_received(&mut self) {
        self.replies_received += 1;
    }

    pub fn increment_replies_dropped(&mut self) {
        self.replies_dropped += 1;
    }

    pub fn increment_checksum_mismatches(&mut self) {
        self.checksum_mismatches += 1;
    }

    pub fn increment_nacks(&mut self) {
        self.nacks += 1;
    }

    pub fn increment_login_attempts(&mut self) {
        self.login_attempts += 1;
    }

    pub fn increment_telemetry_polls(&mut self) {
        self.telemetry_polls += 1;
    }

    /// Share of inbound notifications that were dropped, in percent
    ///
    /// Returns 0.0 if nothing has been received.
    pub fn drop_rate(&self) -> f64 {
        let total = self.replies_received + self.replies_dropped;
        if total == 0 {
            0.0
        } else {
            (self.replies_dropped as f64 / total as f64) * 100.0
        }
    }
}
