//! # Flight operations
//!
//! Multi-step operations composed from [`Link`](crate::session::Link) primitives. Each operation
//! is a fixed sequence of [`Step`]s. The first failing step aborts the operation with
//! [`Error::Flight`](crate::Error::Flight), which names the operation and the step and keeps the
//! original error as its source. Nothing is retried and nothing is rolled back.
//!
//! Step transitions are reported to a [`FlightObserver`].

mod commander;
mod observer;

use std::fmt::{Display, Formatter};

pub use commander::FlightCommander;
pub use observer::{FlightObserver, LogObserver};

/// Flight operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Take off to altitude.
    Takeoff,
    /// Land at the current position.
    Land,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Takeoff => f.write_str("takeoff"),
            Operation::Land => f.write_str("land"),
        }
    }
}

/// Step of a flight operation.
///
/// Takeoff passes all steps in order. Landing skips [`Step::Validate`], [`Step::Armed`],
/// [`Step::PositionAcquired`] and [`Step::CommandSent`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Arguments are checked.
    Validate,
    /// Flight mode is requested.
    ModeSet,
    /// Motors are armed.
    Armed,
    /// Current position is received.
    PositionAcquired,
    /// Action command is sent.
    CommandSent,
    /// Command acknowledgment is awaited.
    AckAwaited,
    /// Vehicle accepted the command.
    Confirmed,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Validate => "validate",
            Step::ModeSet => "mode set",
            Step::Armed => "armed",
            Step::PositionAcquired => "position acquired",
            Step::CommandSent => "command sent",
            Step::AckAwaited => "ack awaited",
            Step::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}
