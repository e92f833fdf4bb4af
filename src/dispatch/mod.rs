//! Wall-clock command replay

pub mod dispatcher;

pub use dispatcher::{DispatchReport, TimedDispatcher, DEFAULT_LATENESS_WARNING};
