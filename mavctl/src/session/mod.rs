//! # Vehicle session
//!
//! [`Session`] is a live connection to a single vehicle. It is created by a handshake: opening the
//! transport and waiting for the first heartbeat. The sender of that heartbeat becomes the
//! [`Target`] of every command issued through the session.
//!
//! All operations are synchronous and bounded by [`Timeouts`]. The session guards its [`Link`]
//! with a mutex, so operations invoked from different threads are serialized as whole
//! send-and-wait sequences.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use mavctl::io::mavlink::MavlinkConnector;
//! use mavctl::session::Session;
//!
//! let session = Session::builder()
//!     .handshake_timeout(Duration::from_secs(30))
//!     .ack_timeout(Duration::from_secs(5))
//!     .connect("udpin:0.0.0.0:14550", &MavlinkConnector::new())
//!     .unwrap();
//!
//! session.takeoff(10.0).unwrap();
//! if let Some(snapshot) = session.telemetry().unwrap() {
//!     println!("{snapshot:?}");
//! }
//! session.land().unwrap();
//! ```

mod conf;
mod link;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::errors::ConnectionError;
use crate::flight::{FlightCommander, FlightObserver, LogObserver};
use crate::io::mavlink::{MavlinkConnector, MavlinkTransport};
use crate::io::{CancelToken, Connector, Correlation, Expect, Transport};
use crate::protocol::Target;
use crate::telemetry::TelemetrySnapshot;

use crate::prelude::*;

pub use conf::Timeouts;
pub use link::Link;

/// Connection to a single vehicle.
///
/// Created by [`SessionBuilder::connect`], [`SessionBuilder::with_transport`] or
/// [`Session::connect`]. Dropping a session closes the transport.
pub struct Session<T: Transport = MavlinkTransport> {
    link: Mutex<Link<T>>,
    target: Target,
    observer: Arc<dyn FlightObserver>,
}

impl Session {
    /// Creates a session builder with default timeouts.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Connects to a MAVLink `endpoint` with default settings.
    ///
    /// Blocks until a heartbeat is received. See [`Endpoint`](crate::io::mavlink::Endpoint) for
    /// accepted formats.
    pub fn connect(endpoint: &str) -> Result<Self> {
        SessionBuilder::new().connect(endpoint, &MavlinkConnector::new())
    }
}

impl<T: Transport> Session<T> {
    /// Vehicle this session talks to.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Grants exclusive access to the link.
    ///
    /// Other operations of this session block until the returned guard is dropped.
    pub fn lock(&self) -> Result<MutexGuard<'_, Link<T>>> {
        Ok(self.link.lock()?)
    }

    /// Arms motors. See [`Link::arm`].
    pub fn arm(&self) -> Result<()> {
        self.lock()?.arm()
    }

    /// Disarms motors. See [`Link::disarm`].
    pub fn disarm(&self) -> Result<()> {
        self.lock()?.disarm()
    }

    /// Switches vehicle to a flight mode. See [`Link::set_mode`].
    pub fn set_mode(&self, name: &str) -> Result<()> {
        self.lock()?.set_mode(name)
    }

    /// Takes off to `altitude` meters. See [`FlightCommander::takeoff`].
    pub fn takeoff(&self, altitude: f64) -> Result<()> {
        let mut link = self.lock()?;
        FlightCommander::new(&mut link, self.observer.as_ref()).takeoff(altitude)
    }

    /// Lands at the current position. See [`FlightCommander::land`].
    pub fn land(&self) -> Result<()> {
        let mut link = self.lock()?;
        FlightCommander::new(&mut link, self.observer.as_ref()).land()
    }

    /// Reads a single telemetry message.
    ///
    /// Returns `Ok(None)` if no telemetry arrived within the telemetry timeout.
    pub fn telemetry(&self) -> Result<Option<TelemetrySnapshot>> {
        Ok(self.lock()?.read_telemetry())
    }

    /// Waits for a message that satisfies `expect`.
    pub fn wait_for(&self, expect: &Expect, timeout: Duration) -> Result<Correlation> {
        Ok(self.lock()?.wait_for(expect, timeout))
    }
}

/// Builder for [`Session`].
#[derive(Clone)]
pub struct SessionBuilder {
    timeouts: Timeouts,
    observer: Arc<dyn FlightObserver>,
    cancel: CancelToken,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            observer: Arc::new(LogObserver),
            cancel: CancelToken::new(),
        }
    }
}

impl SessionBuilder {
    /// Creates a builder with default timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets all timeouts at once.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets bound of a single receive attempt.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.timeouts.poll_interval = poll_interval;
        self
    }

    /// Sets time to wait for the first heartbeat. Waits forever by default.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.handshake = Some(timeout);
        self
    }

    /// Sets time to wait for motors to become armed or disarmed.
    pub fn arm_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.arm = timeout;
        self
    }

    /// Sets time to wait for a position report before takeoff.
    pub fn position_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.position = timeout;
        self
    }

    /// Sets time to wait for a command acknowledgment.
    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.ack = timeout;
        self
    }

    /// Sets time to wait for a telemetry message.
    pub fn telemetry_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.telemetry = timeout;
        self
    }

    /// Sets observer of flight operation steps. Steps are logged by default.
    pub fn observer(mut self, observer: impl FlightObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Sets token that cancels the handshake and every wait of the session.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Opens a transport for `endpoint` and performs the handshake.
    pub fn connect<C: Connector>(
        self,
        endpoint: &str,
        connector: &C,
    ) -> Result<Session<C::Transport>> {
        log::info!("[session] connecting to {endpoint}");

        let transport = connector.open(endpoint).map_err(|err| ConnectionError::Open {
            endpoint: endpoint.to_string(),
            source: Box::new(err),
        })?;

        self.with_transport(transport)
    }

    /// Performs the handshake over an already opened transport.
    pub fn with_transport<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let link = Link::handshake(transport, self.timeouts, self.cancel)?;

        Ok(Session {
            target: link.target(),
            link: Mutex::new(link),
            observer: self.observer,
        })
    }
}
