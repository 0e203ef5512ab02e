//! Per-chunk retry state machine.
//!
//! `Pending -> InFlight -> {Done | RetryScheduled -> InFlight | Failed}`

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Pending,
    InFlight,
    RetryScheduled(Duration),
    Done,
    Failed,
}

/// Mutable record for one chunk while it is being fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkState {
    pub index: usize,
    pub attempts: u32,
    pub status: ChunkStatus,
    pub bytes_written: u64,
}

impl ChunkState {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            attempts: 0,
            status: ChunkStatus::Pending,
            bytes_written: 0,
        }
    }

    /// Enter `InFlight` and return the 1-based number of the attempt being started.
    pub fn begin_attempt(&mut self) -> u32 {
        debug_assert!(
            matches!(
                self.status,
                ChunkStatus::Pending | ChunkStatus::RetryScheduled(_)
            ),
            "attempt started from {:?}",
            self.status
        );
        self.attempts += 1;
        self.status = ChunkStatus::InFlight;
        self.attempts
    }

    pub fn schedule_retry(&mut self, delay: Duration) {
        self.status = ChunkStatus::RetryScheduled(delay);
    }

    pub fn complete(&mut self, bytes_written: u64) {
        self.bytes_written = bytes_written;
        self.status = ChunkStatus::Done;
    }

    pub fn fail(&mut self) {
        self.status = ChunkStatus::Failed;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ChunkStatus::Done | ChunkStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut s = ChunkState::new(2);
        assert_eq!(s.status, ChunkStatus::Pending);
        assert_eq!(s.begin_attempt(), 1);
        assert_eq!(s.status, ChunkStatus::InFlight);
        s.complete(100);
        assert_eq!(s.status, ChunkStatus::Done);
        assert_eq!(s.bytes_written, 100);
        assert!(s.is_terminal());
    }

    #[test]
    fn retry_then_fail() {
        let mut s = ChunkState::new(0);
        s.begin_attempt();
        s.schedule_retry(Duration::from_secs(2));
        assert_eq!(s.status, ChunkStatus::RetryScheduled(Duration::from_secs(2)));
        assert!(!s.is_terminal());
        assert_eq!(s.begin_attempt(), 2);
        s.fail();
        assert_eq!(s.status, ChunkStatus::Failed);
        assert_eq!(s.attempts, 2);
    }
}
