//! Shared output state between the capture worker and the speech output stage.
//!
//! A single atomic word holds both "is output in flight" and "stop
//! requested", so a stop request can only land while output is actually
//! playing. A stop phrase heard just after speech finished therefore cannot
//! cancel the next reply.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const SILENT: u8 = 0;
const SPEAKING: u8 = 1;
const STOP_REQUESTED: u8 = 2;

/// Cloneable handle to the output/cancellation state.
#[derive(Debug, Clone, Default)]
pub struct OutputSignal {
    state: Arc<AtomicU8>,
}

impl OutputSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark output as in flight.
    pub fn begin(&self) {
        self.state.store(SPEAKING, Ordering::Release);
    }

    /// Mark output as finished and clear any stop request.
    ///
    /// Returns `true` if a stop was requested while speaking.
    pub fn finish(&self) -> bool {
        self.state.swap(SILENT, Ordering::AcqRel) == STOP_REQUESTED
    }

    /// Request that in-flight output stop at its next poll.
    ///
    /// Returns `false` (and changes nothing) when no output is playing.
    pub fn request_stop(&self) -> bool {
        self.state
            .compare_exchange(SPEAKING, STOP_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether output is in flight (including a pending stop).
    pub fn is_speaking(&self) -> bool {
        self.state.load(Ordering::Acquire) != SILENT
    }

    /// Whether a stop has been requested for the in-flight output.
    pub fn stop_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOP_REQUESTED
    }
}
