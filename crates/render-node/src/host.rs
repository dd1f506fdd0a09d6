//! Facts about the machine the agent runs on.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use sysinfo::System;

/// First private IPv4 of this host, found by asking the kernel which local
/// address it would route to `peer` from. Nothing is sent.
pub fn detect_private_ip(peer: Ipv4Addr, port: u16) -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((peer, port)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(local) if local.ip().is_private() => Some(*local.ip()),
        _ => None,
    }
}

/// Address the agent advertises: the override, the detected private
/// address, or `0.0.0.0`.
pub fn advertise_address(admin: Ipv4Addr, admin_port: u16, pinned: Option<Ipv4Addr>) -> Ipv4Addr {
    pinned
        .or_else(|| detect_private_ip(admin, admin_port))
        .unwrap_or(Ipv4Addr::UNSPECIFIED)
}

/// Percentage of physical memory in use. Zero when the platform reports
/// no memory at all.
pub fn memory_utilization() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    utilization(sys.used_memory(), sys.total_memory())
}

fn utilization(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_is_a_percentage() {
        assert!((utilization(750, 1000) - 75.0).abs() < f64::EPSILON);
        assert_eq!(utilization(0, 0), 0.0);
    }

    #[test]
    fn host_memory_is_reported() {
        let pct = memory_utilization();
        assert!(pct > 0.0 && pct <= 100.0, "{pct}");
    }

    #[test]
    fn override_wins() {
        let ip = Ipv4Addr::new(10, 6, 0, 77);
        assert_eq!(advertise_address(Ipv4Addr::new(10, 6, 0, 10), 3000, Some(ip)), ip);
    }
}
