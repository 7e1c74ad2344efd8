//! # MAVLink transport
//!
//! [`Transport`](crate::io::Transport) implementation which speaks MAVLink 2 `common` dialect
//! over TCP, UDP or serial port. Frame encoding and decoding is performed by
//! [Mavio](https://crates.io/crates/mavio).
//!
//! # Usage
//!
//! ```rust,no_run
//! use mavctl::io::mavlink::MavlinkConnector;
//! use mavctl::io::Connector;
//!
//! let connector = MavlinkConnector::new().system_id(250).component_id(191);
//! let transport = connector.open("tcp:127.0.0.1:5760").unwrap();
//! ```

mod codec;
mod endpoint;
mod inbox;
mod transport;
mod udp_rw;

use crate::consts::{DEFAULT_COMPONENT_ID, DEFAULT_SYSTEM_ID};
use crate::io::Connector;
use crate::protocol::Target;

use crate::prelude::*;

pub use endpoint::Endpoint;
pub use transport::MavlinkTransport;

/// Opens [`MavlinkTransport`]s.
///
/// Carries MAVLink identity of this ground control station.
#[derive(Clone, Debug)]
pub struct MavlinkConnector {
    source: Target,
}

impl Default for MavlinkConnector {
    fn default() -> Self {
        Self {
            source: Target {
                system_id: DEFAULT_SYSTEM_ID,
                component_id: DEFAULT_COMPONENT_ID,
            },
        }
    }
}

impl MavlinkConnector {
    /// Creates a connector with default ground station identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets system id of this ground control station.
    pub fn system_id(mut self, system_id: u8) -> Self {
        self.source.system_id = system_id;
        self
    }

    /// Sets component id of this ground control station.
    pub fn component_id(mut self, component_id: u8) -> Self {
        self.source.component_id = component_id;
        self
    }

    /// Identity of this ground control station.
    pub fn source(&self) -> Target {
        self.source
    }
}

impl Connector for MavlinkConnector {
    type Transport = MavlinkTransport;

    fn open(&self, endpoint: &str) -> Result<Self::Transport> {
        let endpoint: Endpoint = endpoint.parse()?;
        MavlinkTransport::open(&endpoint, self.source)
    }
}
