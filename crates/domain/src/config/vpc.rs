use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VPC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Network placement of the admin node and its render nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcConfig {
    /// Private address of this admin node.
    #[serde(default = "d_admin_address")]
    pub admin_address: Ipv4Addr,
    /// Subnet scanned for render nodes.
    #[serde(default = "d_cidr")]
    pub cidr: String,
    #[serde(default = "d_vpc_id")]
    pub vpc_id: String,
    /// Port the render node agents listen on.
    #[serde(default = "d_4000")]
    pub render_port: u16,
}

impl Default for VpcConfig {
    fn default() -> Self {
        Self {
            admin_address: d_admin_address(),
            cidr: d_cidr(),
            vpc_id: d_vpc_id(),
            render_port: 4000,
        }
    }
}

fn d_admin_address() -> Ipv4Addr {
    Ipv4Addr::new(10, 6, 0, 10)
}
fn d_cidr() -> String {
    "10.6.0.0/24".into()
}
fn d_vpc_id() -> String {
    "vpc-render-cluster".into()
}
fn d_4000() -> u16 {
    4000
}
