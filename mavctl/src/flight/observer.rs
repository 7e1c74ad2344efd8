use crate::flight::{Operation, Step};

use crate::prelude::*;

/// Receives step transitions of flight operations.
///
/// All methods have empty default implementations.
pub trait FlightObserver: Send + Sync {
    /// Called when `operation` enters `step`.
    fn on_step(&self, operation: Operation, step: Step) {
        let _ = (operation, step);
    }

    /// Called when `operation` fails at `step`.
    fn on_failure(&self, operation: Operation, step: Step, error: &Error) {
        let _ = (operation, step, error);
    }

    /// Called when `operation` is confirmed by the vehicle.
    fn on_complete(&self, operation: Operation) {
        let _ = operation;
    }
}

/// Observer that logs step transitions.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogObserver;

impl FlightObserver for LogObserver {
    fn on_step(&self, operation: Operation, step: Step) {
        log::debug!("[{operation}] {step}");
    }

    fn on_failure(&self, operation: Operation, step: Step, error: &Error) {
        log::warn!("[{operation}] failed at {step}: {error}");
    }

    fn on_complete(&self, operation: Operation) {
        log::info!("[{operation}] confirmed by vehicle");
    }
}
