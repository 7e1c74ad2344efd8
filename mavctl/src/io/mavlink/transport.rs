use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mavio::io::{StdIoReader, StdIoWriter};
use mavio::protocol::V2;

use crate::consts::{IO_READ_TIMEOUT, READER_MAX_FAILURES};
use crate::errors::CommandError;
use crate::io::mavlink::codec::{decode_frame, encode_command, Inbound};
use crate::io::mavlink::inbox::Inbox;
use crate::io::mavlink::udp_rw::UdpRW;
use crate::io::mavlink::Endpoint;
use crate::io::Transport;
use crate::protocol::{
    CommandLong, Heartbeat, Message, MessageKind, ModeTable, Target, MAV_AUTOPILOT_INVALID,
};

use crate::prelude::*;

/// Capacity of the inbound message queue.
const INBOUND_CAPACITY: usize = 256;

type FrameWriter = mavio::Sender<std::io::Error, StdIoWriter<Box<dyn Write + Send>>, V2>;

/// MAVLink 2 [`Transport`] over TCP, UDP or serial port.
///
/// Frames are read by a background thread which locks onto the first flight controller that sends
/// a heartbeat. Afterwards, messages from other systems are dropped, and so are heartbeats from
/// other components of the vehicle (gimbals, cameras, companion computers). The thread stops when
/// the transport is dropped or the link fails.
///
/// Inbound messages are queued up to a fixed capacity. When the queue is full, the oldest
/// messages are dropped.
pub struct MavlinkTransport {
    endpoint: Endpoint,
    source: Target,
    sequence: u8,
    writer: FrameWriter,
    inbox: Arc<Inbox>,
    vehicle: Arc<Mutex<Option<Heartbeat>>>,
    running: Arc<AtomicBool>,
}

impl MavlinkTransport {
    /// Opens a transport for the `endpoint`.
    ///
    /// `source` is the system and component id of this ground control station.
    pub fn open(endpoint: &Endpoint, source: Target) -> Result<Self> {
        log::debug!("[{endpoint}] opening MAVLink transport as {source}");

        match endpoint {
            Endpoint::TcpClient(addr) => {
                let stream = TcpStream::connect(addr)?;
                stream.set_nodelay(true)?;
                stream.set_read_timeout(Some(IO_READ_TIMEOUT))?;
                let reader = stream.try_clone()?;
                Ok(Self::spawn(endpoint.clone(), source, reader, stream))
            }
            Endpoint::UdpIn(addr) => {
                let writer = UdpRW::bind(*addr)?;
                writer.socket().set_read_timeout(Some(IO_READ_TIMEOUT))?;
                let reader = writer.try_clone()?;
                Ok(Self::spawn(endpoint.clone(), source, reader, writer))
            }
            Endpoint::UdpOut(addr) => {
                let writer = UdpRW::connect(*addr)?;
                writer.socket().set_read_timeout(Some(IO_READ_TIMEOUT))?;
                let reader = writer.try_clone()?;
                Ok(Self::spawn(endpoint.clone(), source, reader, writer))
            }
            #[cfg(feature = "serial")]
            Endpoint::Serial { path, baud_rate } => {
                let writer = serialport::new(path, *baud_rate)
                    .timeout(IO_READ_TIMEOUT)
                    .open()?;
                let reader = writer.try_clone()?;
                Ok(Self::spawn(endpoint.clone(), source, reader, writer))
            }
            #[cfg(not(feature = "serial"))]
            Endpoint::Serial { .. } => Err(Error::Endpoint(format!(
                "`{endpoint}` requires `serial` feature"
            ))),
        }
    }

    fn spawn<R, W>(endpoint: Endpoint, source: Target, reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let vehicle = Arc::new(Mutex::new(None));
        let inbox = Arc::new(Inbox::new(INBOUND_CAPACITY));

        {
            let reader = PatientReader {
                inner: reader,
                running: running.clone(),
            };
            let handler = ReadHandler {
                endpoint: endpoint.clone(),
                filter: VehicleFilter::new(source),
                vehicle: vehicle.clone(),
                running: running.clone(),
                inbox: inbox.clone(),
            };
            thread::spawn(move || handler.run(reader));
        }

        let writer: Box<dyn Write + Send> = Box::new(writer);

        Self {
            endpoint,
            source,
            sequence: 0,
            writer: mavio::Sender::new(StdIoWriter::new(writer)),
            inbox,
            vehicle,
            running,
        }
    }

    /// Endpoint of this transport.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Last heartbeat received from the vehicle.
    pub fn last_heartbeat(&self) -> Result<Option<Heartbeat>> {
        Ok(*self.vehicle.lock()?)
    }

    /// Returns `true` if the reader is still running.
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn next_sequence(&mut self) -> u8 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }
}

impl Transport for MavlinkTransport {
    fn send(&mut self, command: &CommandLong) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }

        let sequence = self.next_sequence();
        let frame = encode_command(command, self.source, sequence)?;

        log::trace!(
            "[{}] sending command #{} to {}:{}",
            self.endpoint,
            command.command,
            command.target_system,
            command.target_component
        );

        self.writer
            .send(&frame)
            .map_err(|err| Error::Protocol(format!("can't send frame: {err:?}")))?;
        Ok(())
    }

    fn receive(&mut self, kinds: &[MessageKind], timeout: Duration) -> Result<Option<Message>> {
        let started = Instant::now();

        loop {
            let remaining = match timeout.checked_sub(started.elapsed()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => return Ok(None),
            };

            match self.inbox.recv_timeout(remaining)? {
                Some(message) if kinds.contains(&message.kind()) => return Ok(Some(message)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    fn mode_table(&mut self) -> Result<ModeTable> {
        let heartbeat = self
            .last_heartbeat()?
            .ok_or_else(|| CommandError::mode_table("vehicle did not send heartbeats yet"))?;

        ModeTable::for_vehicle(heartbeat.autopilot, heartbeat.vehicle_type).ok_or_else(|| {
            CommandError::mode_table(format!(
                "vehicle type {} with autopilot {} is not supported",
                heartbeat.vehicle_type, heartbeat.autopilot
            ))
            .into()
        })
    }
}

impl Drop for MavlinkTransport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        log::debug!("[{}] MAVLink transport closed", self.endpoint);
    }
}

struct ReadHandler {
    endpoint: Endpoint,
    filter: VehicleFilter,
    vehicle: Arc<Mutex<Option<Heartbeat>>>,
    running: Arc<AtomicBool>,
    inbox: Arc<Inbox>,
}

impl ReadHandler {
    fn run<R: Read>(mut self, reader: PatientReader<R>) {
        let endpoint = self.endpoint.clone();
        let mut receiver: mavio::Receiver<std::io::Error, StdIoReader<PatientReader<R>>, V2> =
            mavio::Receiver::new(StdIoReader::new(reader));
        let mut failures = 0;

        log::trace!("[{endpoint}] reader started");

        while self.running.load(Ordering::Acquire) {
            let frame = match receiver.recv() {
                Ok(frame) => {
                    failures = 0;
                    frame
                }
                Err(err) => {
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                    failures += 1;
                    log::trace!("[{endpoint}] can't read frame ({failures}): {err:?}");
                    if failures >= READER_MAX_FAILURES {
                        log::warn!("[{endpoint}] link failed: {err:?}");
                        break;
                    }
                    continue;
                }
            };

            let Some(inbound) = decode_frame(&frame) else {
                continue;
            };

            let searching = self.filter.vehicle().is_none();
            if !self.filter.accept(&inbound) {
                continue;
            }
            if searching {
                log::info!("[{endpoint}] vehicle found at {}", inbound.source);
            }

            if let Message::Heartbeat(heartbeat) = &inbound.message {
                match self.vehicle.lock() {
                    Ok(mut vehicle) => *vehicle = Some(*heartbeat),
                    Err(_) => break,
                }
            }

            match self.inbox.push(inbound.message) {
                Ok(None) => {}
                Ok(Some(message)) => {
                    log::trace!("[{endpoint}] inbound queue is full, dropping {message:?}");
                }
                Err(_) => break,
            }
        }

        self.running.store(false, Ordering::Release);
        self.inbox.close();
        log::debug!("[{endpoint}] reader stopped");
    }
}

/// Decides which inbound messages belong to the vehicle.
///
/// Locks onto the sender of the first heartbeat that comes from a flight controller. Ground
/// stations and components without an autopilot (`MAV_AUTOPILOT_INVALID`) are never locked onto.
/// Once locked, heartbeats are accepted only from the vehicle component, while other messages are
/// accepted from any component of the vehicle system.
struct VehicleFilter {
    source: Target,
    vehicle: Option<Target>,
}

impl VehicleFilter {
    fn new(source: Target) -> Self {
        Self {
            source,
            vehicle: None,
        }
    }

    fn vehicle(&self) -> Option<Target> {
        self.vehicle
    }

    fn accept(&mut self, inbound: &Inbound) -> bool {
        if inbound.source.system_id == self.source.system_id {
            return false;
        }

        match (self.vehicle, &inbound.message) {
            (Some(vehicle), Message::Heartbeat(_)) => inbound.source == vehicle,
            (Some(vehicle), _) => inbound.source.system_id == vehicle.system_id,
            (None, Message::Heartbeat(heartbeat))
                if !inbound.from_gcs && heartbeat.autopilot != MAV_AUTOPILOT_INVALID =>
            {
                self.vehicle = Some(inbound.source);
                true
            }
            (None, _) => false,
        }
    }
}

/// Reader which retries on read timeouts while the transport is running.
///
/// Underlying sockets use read timeouts, so the reader can notice that transport was closed.
/// Timeouts must not reach the frame decoder, since they may happen in the middle of a frame.
struct PatientReader<R: Read> {
    inner: R,
    running: Arc<AtomicBool>,
}

impl<R: Read> Read for PatientReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            if !self.running.load(Ordering::Acquire) {
                return Err(std::io::ErrorKind::ConnectionAborted.into());
            }

            match self.inner.read(buf) {
                Err(err)
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::TimedOut
                            | std::io::ErrorKind::WouldBlock
                            | std::io::ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                res => return res,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GlobalPositionInt;
    use crate::test_utils::{gimbal_heartbeat, heartbeat, ScriptedTransport};
    use std::io::Cursor;

    struct Stutter {
        data: Cursor<Vec<u8>>,
        stalls: usize,
    }

    impl Read for Stutter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(std::io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(1);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn patient_reader_retries_timeouts() {
        let mut reader = PatientReader {
            inner: Stutter {
                data: Cursor::new(vec![1, 2, 3]),
                stalls: 5,
            },
            running: Arc::new(AtomicBool::new(true)),
        };

        let mut buf = [0u8; 3];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn patient_reader_stops_when_transport_is_closed() {
        let mut reader = PatientReader {
            inner: Stutter {
                data: Cursor::new(vec![1]),
                stalls: usize::MAX,
            },
            running: Arc::new(AtomicBool::new(false)),
        };

        let err = reader.read(&mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionAborted);
    }

    const GCS: Target = Target {
        system_id: 255,
        component_id: 190,
    };

    fn inbound(source: Target, message: Message) -> Inbound {
        Inbound {
            source,
            message,
            from_gcs: false,
        }
    }

    fn autopilot_heartbeat() -> Inbound {
        inbound(
            ScriptedTransport::VEHICLE,
            Message::Heartbeat(heartbeat(false)),
        )
    }

    fn gimbal() -> Inbound {
        inbound(
            ScriptedTransport::GIMBAL,
            Message::Heartbeat(gimbal_heartbeat()),
        )
    }

    #[test]
    fn filter_locks_onto_flight_controller() {
        let mut filter = VehicleFilter::new(GCS);

        assert!(!filter.accept(&gimbal()));
        assert_eq!(filter.vehicle(), None);

        assert!(filter.accept(&autopilot_heartbeat()));
        assert_eq!(filter.vehicle(), Some(ScriptedTransport::VEHICLE));
    }

    #[test]
    fn filter_drops_heartbeats_of_other_components() {
        let mut filter = VehicleFilter::new(GCS);
        filter.accept(&autopilot_heartbeat());

        assert!(!filter.accept(&gimbal()));
        assert!(filter.accept(&autopilot_heartbeat()));
        assert!(filter.accept(&inbound(
            ScriptedTransport::GIMBAL,
            Message::GlobalPositionInt(GlobalPositionInt::default()),
        )));
    }

    #[test]
    fn filter_drops_other_systems_and_ground_stations() {
        let mut filter = VehicleFilter::new(GCS);

        let mut ground_station = inbound(
            Target {
                system_id: 254,
                component_id: 190,
            },
            Message::Heartbeat(heartbeat(false)),
        );
        ground_station.from_gcs = true;
        assert!(!filter.accept(&ground_station));

        let own = inbound(GCS, Message::Heartbeat(heartbeat(false)));
        assert!(!filter.accept(&own));

        filter.accept(&autopilot_heartbeat());
        let stranger = inbound(
            Target {
                system_id: 2,
                component_id: 1,
            },
            Message::GlobalPositionInt(GlobalPositionInt::default()),
        );
        assert!(!filter.accept(&stranger));
    }

    #[test]
    #[cfg(not(feature = "serial"))]
    fn serial_endpoint_without_feature_is_rejected() {
        let endpoint = Endpoint::Serial {
            path: "/dev/null".to_string(),
            baud_rate: 57600,
        };
        assert!(matches!(
            MavlinkTransport::open(&endpoint, Target::default()),
            Err(Error::Endpoint(_))
        ));
    }
}
