use crate::wol::{parse_scoped_ipv6, AddressFamily, DatagramSocket, Error, SocketFactory};
use log::{debug, warn};
use nix::sys::socket;
use nix::sys::socket::{
    sockopt, MsgFlags, SockFlag, SockType, SockaddrIn, SockaddrIn6, SockaddrLike,
};
use std::io;
use std::net::{SocketAddr, SocketAddrV6, ToSocketAddrs};
use std::os::unix::io::RawFd;

/// Opens real datagram sockets through the OS.
pub struct UdpSocketFactory;

impl SocketFactory for UdpSocketFactory {
    type Socket = UdpSocket;

    fn open(&self, family: AddressFamily) -> Result<UdpSocket, Error> {
        UdpSocket::open(family)
    }
}

/// An unbound, unconnected UDP socket. Closed on drop.
pub struct UdpSocket {
    fd: RawFd,
    family: AddressFamily,
}

impl UdpSocket {
    pub fn open(family: AddressFamily) -> Result<Self, Error> {
        let domain = match family {
            AddressFamily::Ipv4 => socket::AddressFamily::Inet,
            AddressFamily::Ipv6 => socket::AddressFamily::Inet6,
        };
        let fd = socket::socket(domain, SockType::Datagram, SockFlag::empty(), None)
            .map_err(io::Error::from)?;
        debug!("opened {} datagram socket (fd {})", family, fd);
        Ok(Self { fd, family })
    }

    fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, Error> {
        if let Some((ip, Some(zone))) = parse_scoped_ipv6(host) {
            if self.family == AddressFamily::Ipv6 {
                let addr = SocketAddrV6::new(ip, port, 0, scope_id(zone)?);
                return Ok(SocketAddr::V6(addr));
            }
        }
        let addr = (host, port)
            .to_socket_addrs()?
            .find(|addr| self.family.matches(addr))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no {} address found for {}", self.family, host),
                )
            })?;
        Ok(addr)
    }
}

/// Zones are either a numeric scope id or an interface name.
fn scope_id(zone: &str) -> Result<u32, Error> {
    if let Ok(id) = zone.parse() {
        return Ok(id);
    }
    let id = nix::net::if_::if_nametoindex(zone).map_err(|e| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("unknown IPv6 zone {}: {}", zone, e),
        )
    })?;
    Ok(id)
}

fn sockaddr(addr: SocketAddr) -> Box<dyn SockaddrLike> {
    match addr {
        SocketAddr::V4(addr) => Box::new(SockaddrIn::from(addr)),
        SocketAddr::V6(addr) => Box::new(SockaddrIn6::from(addr)),
    }
}

impl DatagramSocket for UdpSocket {
    fn bind(&self, host: &str, port: u16) -> Result<(), Error> {
        let addr = self.resolve(host, port)?;
        debug!("binding fd {} to {}", self.fd, addr);
        socket::bind(self.fd, sockaddr(addr).as_ref()).map_err(io::Error::from)?;
        Ok(())
    }

    fn set_broadcast(&self, on: bool) -> Result<(), Error> {
        debug!("setting SO_BROADCAST={} on fd {}", on, self.fd);
        socket::setsockopt(self.fd, sockopt::Broadcast, &on).map_err(io::Error::from)?;
        Ok(())
    }

    fn connect(&self, host: &str, port: u16) -> Result<(), Error> {
        let addr = self.resolve(host, port)?;
        debug!("connecting fd {} to {}", self.fd, addr);
        socket::connect(self.fd, sockaddr(addr).as_ref()).map_err(io::Error::from)?;
        Ok(())
    }

    fn send(&self, buf: &[u8]) -> Result<usize, Error> {
        let sent = socket::send(self.fd, buf, MsgFlags::empty()).map_err(io::Error::from)?;
        debug!("sent {} of {} bytes on fd {}", sent, buf.len(), self.fd);
        Ok(sent)
    }
}

impl Drop for UdpSocket {
    fn drop(&mut self) {
        if let Err(e) = nix::unistd::close(self.fd) {
            warn!("failed to close fd {}: {}", self.fd, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wol::udp::*;
    use crate::wol::{send_magic_packet, SendOptions};
    use std::time::Duration;

    fn listener() -> std::net::UdpSocket {
        let listener = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        listener
    }

    #[test]
    fn delivers_packets_over_loopback() {
        let listener = listener();
        let port = listener.local_addr().unwrap().port();
        let options = SendOptions::new()
            .with_ip_address("127.0.0.1")
            .with_port(port)
            .with_interface("127.0.0.1");
        send_magic_packet(&["01:23:45:67:89:ab", "ff-ff-ff-ff-ff-ff"], &options).unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[..6], &[0xff; 6]);
        assert_eq!(&buf[6..12], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab]);
        assert_eq!(&buf[96..102], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab]);

        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
        assert!(buf[..102].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn resolves_hostnames() {
        let listener = listener();
        let port = listener.local_addr().unwrap().port();
        let options = SendOptions::new().with_ip_address("localhost").with_port(port);
        send_magic_packet(&["133713371337"], &options).unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
    }

    #[test]
    fn delivers_packets_over_ipv6_loopback() {
        // Some sandboxes have no IPv6 loopback at all.
        let Ok(listener) = std::net::UdpSocket::bind("[::1]:0") else {
            return;
        };
        listener
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let options = SendOptions::new().with_ip_address("::1").with_port(port);
        assert_eq!(options.family(), AddressFamily::Ipv6);
        send_magic_packet(&["01:23:45:67:89:ab"], &options).unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[..6], &[0xff; 6]);
        assert_eq!(&buf[96..102], &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab]);
    }

    #[test]
    fn resolves_scoped_ipv6_literals() {
        let Ok(socket) = UdpSocket::open(AddressFamily::Ipv6) else {
            return;
        };
        match socket.resolve("ff02::1%3", 9).unwrap() {
            SocketAddr::V6(addr) => {
                assert_eq!(addr.ip(), &"ff02::1".parse::<std::net::Ipv6Addr>().unwrap());
                assert_eq!(addr.port(), 9);
                assert_eq!(addr.scope_id(), 3);
            }
            other => panic!("unexpected address {}", other),
        }
        let lo = nix::net::if_::if_nametoindex("lo").unwrap();
        match socket.resolve("fe80::1%lo", 7).unwrap() {
            SocketAddr::V6(addr) => assert_eq!(addr.scope_id(), lo),
            other => panic!("unexpected address {}", other),
        }
        assert!(matches!(
            socket.resolve("fe80::1%nosuchif0", 7),
            Err(Error::NetworkError(_))
        ));
    }

    #[test]
    fn bind_to_foreign_address_fails() {
        let socket = UdpSocket::open(AddressFamily::Ipv4).unwrap();
        // TEST-NET-3, never assigned to a local interface.
        let result = socket.bind("203.0.113.77", 0);
        assert!(matches!(result, Err(Error::NetworkError(_))));
    }

    #[test]
    fn family_mismatch_is_a_network_error() {
        let socket = UdpSocket::open(AddressFamily::Ipv4).unwrap();
        let result = socket.connect("fc00::", 9);
        match result {
            Err(Error::NetworkError(e)) => assert_eq!(e.kind(), io::ErrorKind::AddrNotAvailable),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
