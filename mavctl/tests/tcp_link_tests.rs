use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;

use mavio::dialects::common::enums::{
    MavAutopilot, MavCmd, MavModeFlag, MavResult as WireResult, MavState, MavType,
};
use mavio::dialects::common::messages;
use mavio::dialects::Common;
use mavio::io::{StdIoReader, StdIoWriter};
use mavio::protocol::V2;
use mavio::Frame;

use mavctl::io::mavlink::MavlinkConnector;
use mavctl::prelude::*;
use mavctl::session::{Session, SessionBuilder};
use mavctl::telemetry::Metric;

static INIT: Once = Once::new();
const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Debug;
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);
const HOST: &str = "127.0.0.1";

const COPTER_GUIDED: u32 = 4;
const COPTER_LAND: u32 = 9;

const AUTOPILOT_COMPONENT: u8 = 1;
const GIMBAL_COMPONENT: u8 = 154;

fn unused_port() -> portpicker::Port {
    portpicker::pick_unused_port().unwrap()
}

fn initialize() {
    INIT.call_once(|| {
        env_logger::builder()
            // Suppress everything below `warn` for third-party modules
            .filter_level(log::LevelFilter::Warn)
            // Allow everything above `LOG_LEVEL` from current package
            .filter_module(env!("CARGO_PKG_NAME"), LOG_LEVEL)
            .is_test(true)
            .init();
    });
}

macro_rules! vehicle_frame {
    ($sequence:expr, $component_id:expr, $message:expr) => {
        Frame::builder()
            .sequence($sequence)
            .system_id(1)
            .component_id($component_id)
            .version(V2)
            .message(&$message)
            .unwrap()
            .build()
    };
    ($sequence:expr, $message:expr) => {
        vehicle_frame!($sequence, AUTOPILOT_COMPONENT, $message)
    }
}

type VehicleWriter = Arc<Mutex<mavio::Sender<std::io::Error, StdIoWriter<TcpStream>, V2>>>;

/// ArduCopter stand-in which talks MAVLink 2 over TCP.
///
/// Emits heartbeats and position reports, follows mode and arming commands and acknowledges
/// takeoff with a preconfigured result. Optionally carries a gimbal which sends its own
/// heartbeats ahead of the autopilot.
#[derive(Clone)]
struct FakeVehicle {
    takeoff_result: WireResult,
    gimbal: bool,
    armed: Arc<AtomicBool>,
    custom_mode: Arc<Mutex<u32>>,
    sequence: Arc<AtomicU8>,
    commands: Arc<Mutex<Vec<messages::CommandLong>>>,
}

impl FakeVehicle {
    fn new(takeoff_result: WireResult) -> Self {
        Self {
            takeoff_result,
            gimbal: false,
            armed: Arc::new(AtomicBool::new(false)),
            custom_mode: Arc::new(Mutex::new(0)),
            sequence: Arc::new(AtomicU8::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_gimbal(mut self) -> Self {
        self.gimbal = true;
        self
    }

    /// Listens on a free port and returns the endpoint to connect to.
    fn spawn(&self) -> String {
        let port = unused_port();
        let listener = TcpListener::bind((HOST, port)).unwrap();

        let vehicle = self.clone();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let writer: VehicleWriter = Arc::new(Mutex::new(mavio::Sender::new(
                StdIoWriter::new(stream.try_clone().unwrap()),
            )));

            {
                let vehicle = vehicle.clone();
                let writer = writer.clone();
                thread::spawn(move || vehicle.emit_status(writer));
            }

            vehicle.serve_commands(stream, writer);
        });

        format!("tcp:{HOST}:{port}")
    }

    fn commands(&self) -> Vec<messages::CommandLong> {
        self.commands.lock().unwrap().clone()
    }

    fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn emit_status(&self, writer: VehicleWriter) {
        loop {
            let mut base_mode = MavModeFlag::CUSTOM_MODE_ENABLED;
            if self.armed.load(Ordering::Acquire) {
                base_mode |= MavModeFlag::SAFETY_ARMED;
            }

            let heartbeat = vehicle_frame!(
                self.next_sequence(),
                messages::Heartbeat {
                    type_: MavType::Quadrotor,
                    autopilot: MavAutopilot::Ardupilotmega,
                    base_mode,
                    custom_mode: *self.custom_mode.lock().unwrap(),
                    system_status: MavState::Active,
                    ..Default::default()
                }
            );
            let position = vehicle_frame!(
                self.next_sequence(),
                messages::GlobalPositionInt {
                    lat: 520000000,
                    lon: 130000000,
                    alt: 100000,
                    ..Default::default()
                }
            );

            {
                let mut writer = writer.lock().unwrap();
                if self.gimbal {
                    let gimbal = vehicle_frame!(
                        self.next_sequence(),
                        GIMBAL_COMPONENT,
                        messages::Heartbeat {
                            type_: MavType::Gimbal,
                            autopilot: MavAutopilot::Invalid,
                            system_status: MavState::Active,
                            ..Default::default()
                        }
                    );
                    if writer.send(&gimbal).is_err() {
                        return;
                    }
                }
                if writer.send(&heartbeat).is_err() || writer.send(&position).is_err() {
                    return;
                }
            }

            thread::sleep(HEARTBEAT_INTERVAL);
        }
    }

    fn serve_commands(&self, stream: TcpStream, writer: VehicleWriter) {
        let mut receiver: mavio::Receiver<std::io::Error, StdIoReader<TcpStream>, V2> =
            mavio::Receiver::new(StdIoReader::new(stream));

        while let Ok(frame) = receiver.recv() {
            let command = match frame.decode() {
                Ok(Common::CommandLong(command)) => command,
                _ => continue,
            };
            self.commands.lock().unwrap().push(command.clone());

            let mut acks = vec![(command.command, WireResult::Accepted)];
            match command.command {
                MavCmd::ComponentArmDisarm => {
                    self.armed.store(command.param1 == 1.0, Ordering::Release);
                }
                MavCmd::DoSetMode => {
                    let mode = command.param2 as u32;
                    *self.custom_mode.lock().unwrap() = mode;
                    if mode == COPTER_LAND {
                        acks.push((MavCmd::NavLand, WireResult::Accepted));
                    }
                }
                MavCmd::NavTakeoff => acks[0].1 = self.takeoff_result,
                _ => {}
            }

            for (command, result) in acks {
                let ack = vehicle_frame!(
                    self.next_sequence(),
                    messages::CommandAck {
                        command,
                        result,
                        ..Default::default()
                    }
                );
                if writer.lock().unwrap().send(&ack).is_err() {
                    return;
                }
            }
        }
    }
}

fn builder() -> SessionBuilder {
    Session::builder()
        .poll_interval(Duration::from_millis(50))
        .handshake_timeout(Duration::from_secs(5))
        .arm_timeout(Duration::from_secs(2))
        .ack_timeout(Duration::from_secs(2))
}

#[test]
fn takeoff_and_land_over_tcp() {
    initialize();

    let vehicle = FakeVehicle::new(WireResult::Accepted);
    let endpoint = vehicle.spawn();

    let session = builder()
        .connect(&endpoint, &MavlinkConnector::new())
        .unwrap();
    assert_eq!(session.target().system_id, 1);

    session.takeoff(15.0).unwrap();
    session.land().unwrap();

    let commands = vehicle.commands();
    let takeoff = commands
        .iter()
        .find(|command| command.command == MavCmd::NavTakeoff)
        .unwrap();
    assert_eq!(takeoff.target_system, 1);
    assert_eq!(takeoff.param5, 52.0);
    assert_eq!(takeoff.param6, 13.0);
    assert_eq!(takeoff.param7, 15.0);

    let modes: Vec<u32> = commands
        .iter()
        .filter(|command| command.command == MavCmd::DoSetMode)
        .map(|command| command.param2 as u32)
        .collect();
    assert_eq!(modes, vec![COPTER_GUIDED, COPTER_LAND]);
}

#[test]
fn gimbal_heartbeats_do_not_confuse_the_session() {
    initialize();

    let vehicle = FakeVehicle::new(WireResult::Accepted).with_gimbal();
    let endpoint = vehicle.spawn();

    let session = builder()
        .connect(&endpoint, &MavlinkConnector::new())
        .unwrap();
    assert_eq!(session.target().component_id, AUTOPILOT_COMPONENT);

    session.takeoff(15.0).unwrap();
    session.land().unwrap();
    session.disarm().unwrap();

    let commands = vehicle.commands();
    assert!(commands
        .iter()
        .all(|command| command.target_component == AUTOPILOT_COMPONENT));
    let arming: Vec<f32> = commands
        .iter()
        .filter(|command| command.command == MavCmd::ComponentArmDisarm)
        .map(|command| command.param1)
        .collect();
    assert_eq!(arming, vec![1.0, 0.0]);
}

#[test]
fn denied_takeoff_is_reported() {
    initialize();

    let vehicle = FakeVehicle::new(WireResult::Denied);
    let endpoint = vehicle.spawn();

    let session = builder()
        .connect(&endpoint, &MavlinkConnector::new())
        .unwrap();
    let err = session.takeoff(15.0).unwrap_err();

    assert!(matches!(
        err.cause(),
        Error::CommandNotConfirmed {
            result: Some(mavctl::protocol::MavResult::Denied),
            ..
        }
    ));
}

#[test]
fn telemetry_is_read_from_vehicle() {
    initialize();

    let vehicle = FakeVehicle::new(WireResult::Accepted);
    let endpoint = vehicle.spawn();

    let session = builder()
        .connect(&endpoint, &MavlinkConnector::new())
        .unwrap();
    let snapshot = session.telemetry().unwrap().unwrap();

    assert_eq!(snapshot.get(Metric::Latitude), Some(52.0));
    assert_eq!(snapshot.get(Metric::Longitude), Some(13.0));
    assert_eq!(snapshot.get(Metric::Altitude), Some(100.0));
}

#[test]
fn unreachable_endpoint_fails_to_open() {
    initialize();

    let endpoint = format!("tcp:{HOST}:{}", unused_port());
    let result = builder().connect(&endpoint, &MavlinkConnector::new());

    assert!(matches!(
        result,
        Err(Error::Connection(ConnectionError::Open { .. }))
    ));
}
