//! Host Timing
//!
//! - `clock` - injectable monotonic clock (real and simulated)
//! - `cancel` - cancellation token shared across threads
//! - `pacer` - fixed-rate frame pacing

pub mod cancel;
pub mod clock;
pub mod pacer;

pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use pacer::{FramePacer, FrameTiming};
