use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use socket2::{Domain, Protocol, Socket, Type};

/// Room for a few hundred milliseconds of a full ATSC multiplex
const RECV_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Binds a UDP socket for TS reception: unicast, or a joined IPv4 multicast
/// group when `addr` is a multicast address. The socket is non-blocking, ready
/// for `tokio::net::UdpSocket::from_std`.
pub fn create_udp_socket(addr: SocketAddr) -> anyhow::Result<Socket> {
    let ip = match addr.ip() {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => anyhow::bail!("only IPv4 is supported, got {addr}"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if let Err(err) = socket.set_recv_buffer_size(RECV_BUFFER_BYTES) {
        log::warn!("could not enlarge receive buffer: {err}");
    }
    socket
        .bind(&addr.into())
        .with_context(|| format!("binding {addr}"))?;

    if ip.is_multicast() {
        socket
            .join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED)
            .with_context(|| format!("joining multicast group {ip}"))?;
        log::info!("joined multicast group {ip}");
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ipv6() {
        let err = create_udp_socket("[::1]:1234".parse().unwrap()).unwrap_err();
        assert!(err.to_string().contains("IPv4"));
    }

    #[test]
    fn binds_ephemeral_unicast() {
        let socket = create_udp_socket("127.0.0.1:0".parse().unwrap()).unwrap();
        let local = socket.local_addr().unwrap().as_socket().unwrap();
        assert!(local.ip().is_loopback());
        assert_ne!(local.port(), 0);
    }
}
