use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best-effort discovery of the address containers can reach the host on.
/// Connecting a UDP socket only performs a route lookup; no packets are
/// sent. Falls back to loopback when no route is available.
pub fn detect_host_ip() -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let Ok(socket) = UdpSocket::bind(("0.0.0.0", 0)) else {
        return fallback;
    };
    if socket.connect(("8.8.8.8", 80)).is_err() {
        return fallback;
    }

    socket.local_addr().map(|addr| addr.ip()).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_concrete_address() {
        let ip = detect_host_ip();
        assert!(!ip.is_unspecified());
    }
}
