use std::fmt::{Display, Formatter};
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::consts::DEFAULT_BAUD_RATE;

use crate::prelude::*;

/// Parsed MAVLink endpoint.
///
/// Accepted formats:
///
/// * `tcp:<host>:<port>` connects to a TCP server (for example SITL on `tcp:127.0.0.1:5760`).
/// * `udp:<host>:<port>` or `udpin:<host>:<port>` binds a UDP socket and talks to whoever sends
///   datagrams to it first.
/// * `udpout:<host>:<port>` sends datagrams to a remote UDP socket.
/// * `serial:<path>[:<baud>]`, or just `<path>[:<baud>]` for paths starting with `/dev/` and
///   Windows `COM` ports. Requires `serial` feature.
///
/// # Usage
///
/// ```rust
/// use mavctl::io::mavlink::Endpoint;
///
/// let endpoint: Endpoint = "udpin:0.0.0.0:14550".parse().unwrap();
/// assert!(matches!(endpoint, Endpoint::UdpIn(_)));
///
/// let endpoint: Endpoint = "/dev/ttyUSB0:115200".parse().unwrap();
/// assert_eq!(
///     endpoint,
///     Endpoint::Serial { path: "/dev/ttyUSB0".to_string(), baud_rate: 115200 }
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endpoint {
    /// TCP client.
    TcpClient(SocketAddr),
    /// UDP socket bound to a local address.
    UdpIn(SocketAddr),
    /// UDP socket sending to a remote address.
    UdpOut(SocketAddr),
    /// Serial port.
    Serial {
        /// Port path.
        path: String,
        /// Baud rate.
        baud_rate: u32,
    },
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Endpoint("endpoint is empty".to_string()));
        }

        if is_serial_path(s) {
            return parse_serial(s);
        }

        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| Error::Endpoint(format!("missing scheme in `{s}`")))?;

        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Endpoint::TcpClient(resolve(rest)?)),
            "udp" | "udpin" => Ok(Endpoint::UdpIn(resolve(rest)?)),
            "udpout" => Ok(Endpoint::UdpOut(resolve(rest)?)),
            "serial" => parse_serial(rest),
            _ => Err(Error::Endpoint(format!("unsupported scheme `{scheme}`"))),
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::TcpClient(addr) => write!(f, "tcp:{addr}"),
            Endpoint::UdpIn(addr) => write!(f, "udpin:{addr}"),
            Endpoint::UdpOut(addr) => write!(f, "udpout:{addr}"),
            Endpoint::Serial { path, baud_rate } => write!(f, "serial:{path}:{baud_rate}"),
        }
    }
}

fn is_serial_path(s: &str) -> bool {
    s.starts_with("/dev/")
        || (s.len() > 3
            && s[..3].eq_ignore_ascii_case("com")
            && s[3..].starts_with(|c: char| c.is_ascii_digit()))
}

fn parse_serial(s: &str) -> Result<Endpoint> {
    let (path, baud_rate) = match s.rsplit_once(':') {
        Some((path, baud)) if !path.is_empty() => {
            let baud_rate = baud
                .parse::<u32>()
                .map_err(|_| Error::Endpoint(format!("invalid baud rate `{baud}`")))?;
            (path, baud_rate)
        }
        _ => (s, DEFAULT_BAUD_RATE),
    };

    if path.is_empty() {
        return Err(Error::Endpoint("serial port path is empty".to_string()));
    }

    Ok(Endpoint::Serial {
        path: path.to_string(),
        baud_rate,
    })
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|err| Error::Endpoint(format!("can't resolve `{addr}`: {err}")))?
        .next()
        .ok_or_else(|| Error::Endpoint(format!("`{addr}` has no addresses")))
}
