//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Wall-clock time (save timestamps, offline earnings)
//! - Animation-frame scheduling

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Opaque id of a requested animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Schedules one callback per display refresh
///
/// The loop controller keeps at most one request outstanding and cancels it
/// before pausing or restarting.
pub trait FrameScheduler {
    /// Ask for the next frame; `None` if the platform refused
    fn request_frame(&mut self) -> Option<FrameHandle>;
    /// Drop a pending request (no-op if it already fired)
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Unix epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        js_sys::Date::now() as i64
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to (tests, headless runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    pub now_ms: i64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self { now_ms }
    }

    pub fn advance(&mut self, ms: i64) {
        self.now_ms += ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms
    }
}

/// Scheduler that records requests instead of firing them
///
/// The driver delivers frames itself by calling `Game::on_frame`.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: i32,
    /// Requests not yet fired or cancelled
    pub pending: Vec<FrameHandle>,
    pub cancelled: Vec<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest pending request, as the browser would fire it
    pub fn fire(&mut self) -> Option<FrameHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        Some(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
        self.cancelled.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_tracks_pending() {
        let mut s = ManualScheduler::new();
        let a = s.request_frame().unwrap();
        let b = s.request_frame().unwrap();
        assert_ne!(a, b);
        s.cancel_frame(a);
        assert_eq!(s.pending, vec![b]);
        assert_eq!(s.fire(), Some(b));
        assert_eq!(s.fire(), None);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
