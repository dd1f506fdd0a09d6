//! IPv4 helpers for the admin/render node boundary.
//!
//! Render nodes are only ever addressed by private-range IPv4 literals
//! (10/8, 172.16/12, 192.168/16). Anything else is rejected before it
//! reaches the registry.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Regions assigned round-robin from the last address octet.
pub const REGIONS: [&str; 4] = ["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"];

/// Parse `raw` as a private-range IPv4 literal.
pub fn parse_private_ipv4(raw: &str) -> Result<Ipv4Addr> {
    let addr: Ipv4Addr = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAddress(raw.to_string()))?;
    if !addr.is_private() {
        return Err(Error::InvalidAddress(raw.to_string()));
    }
    Ok(addr)
}

pub fn last_octet(addr: Ipv4Addr) -> u8 {
    addr.octets()[3]
}

/// Deterministic region tag for an address.
pub fn region_for(addr: Ipv4Addr) -> &'static str {
    REGIONS[last_octet(addr) as usize % REGIONS.len()]
}

/// An IPv4 CIDR block such as `10.6.0.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::InvalidAddress(format!("{network}/{prefix}")));
        }
        Ok(Self {
            network: Ipv4Addr::from(u32::from(network) & Self::mask(prefix)),
            prefix,
        })
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask(self.prefix) == u32::from(self.network)
    }

    fn mask(prefix: u8) -> u32 {
        match prefix {
            0 => 0,
            p => u32::MAX << (32 - u32::from(p)),
        }
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (net, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        let network: Ipv4Addr = net
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Self::new(network, prefix)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}
