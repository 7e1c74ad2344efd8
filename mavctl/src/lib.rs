//! # Mavctl
//!
//! A client-side controller for a [MAVLink](https://mavlink.io/en/)-speaking UAV. Mavctl
//! establishes a link with a vehicle, switches flight modes, arms motors, issues takeoff and
//! landing commands and reads basic telemetry. Each operation is synchronous and bounded by
//! timeouts: every command waits for the vehicle to confirm it.
//!
//! Encoding and decoding of MAVLink frames is handled by [Mavio](https://gitlab.com/mavka/libs/mavio).
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mavctl::prelude::*;
//! use mavctl::session::Session;
//!
//! # fn main() -> Result<()> {
//! // Connect to ArduPilot SITL and wait for a heartbeat
//! let session = Session::builder()
//!     .handshake_timeout(Duration::from_secs(30))
//!     .connect("tcp:127.0.0.1:5760", &mavctl::io::mavlink::MavlinkConnector::new())?;
//!
//! session.takeoff(10.0)?;
//!
//! if let Some(telemetry) = session.telemetry()? {
//!     for (metric, value) in telemetry.iter() {
//!         println!("{metric}: {value}");
//!     }
//! }
//!
//! session.land()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! * [`io`] defines the [`Transport`](io::Transport) contract, the message
//!   [`Correlator`](io::Correlator) and a MAVLink transport in [`io::mavlink`].
//! * [`session`] performs the handshake and exposes command primitives.
//! * [`flight`] composes primitives into takeoff and landing.
//! * [`telemetry`] reads position, speed and battery state.
//! * [`protocol`] contains typed views of the MAVLink entities the controller uses.
//!
//! # Feature flags
//!
#![doc = document_features::document_features!()]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod consts;
pub mod errors;
pub mod flight;
pub mod io;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod telemetry;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

#[doc(inline = true)]
pub extern crate mavio;

#[doc(inline = true)]
pub use errors::{Error, Result};
