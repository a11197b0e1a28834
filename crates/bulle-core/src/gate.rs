use std::time::Duration;

use tokio::time::Instant;

/// In-flight age after which a cycle is presumed stuck
pub const STUCK_THRESHOLD: Duration = Duration::from_millis(5000);

/// One admitted capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Monotonically increasing, starting at 1
    pub seq: u64,
    pub requested_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// `request.requested_at` is the admission time the watchdog measures from
    InFlight(CaptureRequest),
}

/// Single-flight guard for the capture pipeline with a stuck-state watchdog.
///
/// The capture surface can silently fail to deliver a frame, so a cycle that
/// never releases the gate is replaced by the next trigger once it is older
/// than the stuck threshold.
#[derive(Debug)]
pub struct CaptureGate {
    state: PipelineState,
    stuck_threshold: Duration,
    next_seq: u64,
    recoveries: u64,
}

impl CaptureGate {
    pub fn new(stuck_threshold: Duration) -> Self {
        Self {
            state: PipelineState::Idle,
            stuck_threshold,
            next_seq: 0,
            recoveries: 0,
        }
    }

    /// Admit a new cycle at `now`. Rejection is backpressure, not an error.
    pub fn try_admit(&mut self, now: Instant) -> bool {
        if let PipelineState::InFlight(request) = self.state {
            let age = now.saturating_duration_since(request.requested_at);
            if age <= self.stuck_threshold {
                tracing::trace!("[GATE] cycle {} in flight for {:?}, rejecting", request.seq, age);
                return false;
            }

            tracing::info!(
                "[GATE] cycle {} stuck for {:?}, forcing reset",
                request.seq,
                age
            );
            self.recoveries += 1;
        }

        self.next_seq += 1;
        self.state = PipelineState::InFlight(CaptureRequest {
            seq: self.next_seq,
            requested_at: now,
        });
        true
    }

    /// Back to idle. Safe to call any number of times.
    pub fn release(&mut self) {
        self.state = PipelineState::Idle;
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn current(&self) -> Option<CaptureRequest> {
        match self.state {
            PipelineState::InFlight(request) => Some(request),
            PipelineState::Idle => None,
        }
    }

    /// Whether the gate is currently held by cycle `seq`
    pub fn holds(&self, seq: u64) -> bool {
        self.current().is_some_and(|request| request.seq == seq)
    }

    pub fn is_idle(&self) -> bool {
        self.state == PipelineState::Idle
    }

    /// Number of watchdog resets so far
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new(STUCK_THRESHOLD)
    }
}
