use std::time::{Duration, Instant};

/// Iteration metadata - carries the loop iteration number and timing info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub number: u64,
    /// Time since the loop started
    pub elapsed: Duration,
    /// Time since the previous iteration
    pub delta: Duration,
}

impl FrameInfo {
    pub fn new(number: u64, elapsed: Duration, delta: Duration) -> Self {
        Self {
            number,
            elapsed,
            delta,
        }
    }
}

/// Infinite iterator that yields one `FrameInfo` per render loop iteration
/// Use this in a loop: `for tick in FrameIterator::new() { ... }`
pub struct FrameIterator {
    frame_number: u64,
    start_time: Instant,
    last_frame_time: Instant,
}

impl FrameIterator {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_number: 0,
            start_time: now,
            last_frame_time: now,
        }
    }

    /// Number of iterations yielded so far
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for FrameIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FrameIterator {
    type Item = FrameInfo;

    fn next(&mut self) -> Option<FrameInfo> {
        let now = Instant::now();
        let info = FrameInfo::new(
            self.frame_number,
            now.duration_since(self.start_time),
            now.duration_since(self.last_frame_time),
        );

        self.frame_number += 1;
        self.last_frame_time = now;

        Some(info)
    }
}
