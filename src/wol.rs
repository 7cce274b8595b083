pub mod noop;
pub mod udp;

use crate::magic;
use crate::magic::MagicPacket;
use log::debug;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

pub const BROADCAST_IP: &str = "255.255.255.255";
pub const DEFAULT_PORT: u16 = 9;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Picks IPv6 only when `address` is a numeric IPv6 literal. Hostnames are
    /// never resolved here, so they fall back to IPv4.
    pub fn infer(address: &str) -> Self {
        if is_ipv6_literal(address) {
            Self::Ipv6
        } else {
            Self::Ipv4
        }
    }

    pub fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            Self::Ipv4 => addr.is_ipv4(),
            Self::Ipv6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Ipv6 => write!(f, "IPv6"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidFormat(#[from] magic::Error),
    #[error("Network error: {0}")]
    NetworkError(#[from] io::Error),
}

/// A connectionless socket as seen by the sender. Dropping it releases the
/// underlying handle.
pub trait DatagramSocket {
    fn bind(&self, host: &str, port: u16) -> Result<(), Error>;
    fn set_broadcast(&self, on: bool) -> Result<(), Error>;
    fn connect(&self, host: &str, port: u16) -> Result<(), Error>;
    fn send(&self, buf: &[u8]) -> Result<usize, Error>;
}

pub trait SocketFactory {
    type Socket: DatagramSocket;

    fn open(&self, family: AddressFamily) -> Result<Self::Socket, Error>;
}

/// Where and how magic packets are delivered.
#[derive(Clone, Debug, PartialEq)]
pub struct SendOptions {
    /// Destination host, either a numeric address or a name.
    pub ip_address: String,
    pub port: u16,
    /// Local address to bind the socket to before sending.
    pub interface: Option<String>,
    /// Forces the socket family instead of inferring it from `ip_address`.
    pub address_family: Option<AddressFamily>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            ip_address: BROADCAST_IP.to_string(),
            port: DEFAULT_PORT,
            interface: None,
            address_family: None,
        }
    }
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_address_family(mut self, address_family: AddressFamily) -> Self {
        self.address_family = Some(address_family);
        self
    }

    pub fn family(&self) -> AddressFamily {
        self.address_family
            .unwrap_or_else(|| AddressFamily::infer(&self.ip_address))
    }
}

pub fn is_ipv6_literal(address: &str) -> bool {
    parse_scoped_ipv6(address).is_some()
}

/// Parses an IPv6 literal with an optional `%zone` suffix, e.g. `fe80::1%eth0`
/// or `ff02::1%2`. The zone is returned unresolved.
pub(crate) fn parse_scoped_ipv6(address: &str) -> Option<(Ipv6Addr, Option<&str>)> {
    match address.split_once('%') {
        Some((_, "")) => None,
        Some((addr, zone)) => addr.parse().ok().map(|addr| (addr, Some(zone))),
        None => match address.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => Some((addr, None)),
            _ => None,
        },
    }
}

/// Wakes every machine in `hardware_addresses` using an OS datagram socket.
pub fn send_magic_packet<S: AsRef<str>>(
    hardware_addresses: &[S],
    options: &SendOptions,
) -> Result<(), Error> {
    send_magic_packet_with(&udp::UdpSocketFactory, hardware_addresses, options)
}

/// Builds one packet per address, then sends them in order over a single
/// socket from `factory`.
///
/// Every address is validated before the socket is opened, so a malformed
/// address means nothing is sent. A network failure stops the batch and may
/// leave a prefix of it delivered.
pub fn send_magic_packet_with<F, S>(
    factory: &F,
    hardware_addresses: &[S],
    options: &SendOptions,
) -> Result<(), Error>
where
    F: SocketFactory,
    S: AsRef<str>,
{
    let packets = hardware_addresses
        .iter()
        .map(|addr| magic::create_magic_packet(addr.as_ref()))
        .collect::<Result<Vec<MagicPacket>, _>>()?;

    let family = options.family();
    debug!(
        "sending {} packet(s) to {}:{} over {}",
        packets.len(),
        options.ip_address,
        options.port,
        family
    );

    let socket = factory.open(family)?;
    if let Some(interface) = &options.interface {
        socket.bind(interface, 0)?;
    }
    socket.set_broadcast(true)?;
    socket.connect(&options.ip_address, options.port)?;
    for packet in &packets {
        debug!("sending {:?}", packet);
        socket.send(packet.as_ref())?;
    }
    Ok(())
}
