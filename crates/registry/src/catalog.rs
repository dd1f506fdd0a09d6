//! Hardware descriptors assigned to newly discovered nodes.
//!
//! Render nodes do not report their hardware yet, so descriptors are
//! picked from fixed catalogs keyed on the last address octet. The same
//! address always yields the same descriptors.

use std::net::Ipv4Addr;

use rf_domain::address::last_octet;
use rf_domain::node::{GpuInfo, SystemInfo};

struct GpuModel {
    name: &'static str,
    memory: &'static str,
    temperature: &'static str,
    utilization: &'static str,
}

struct SystemModel {
    os: &'static str,
    cpu: &'static str,
    ram: &'static str,
    uptime: &'static str,
}

const GPUS: [GpuModel; 5] = [
    GpuModel { name: "NVIDIA RTX 4090", memory: "24GB", temperature: "65°C", utilization: "45%" },
    GpuModel { name: "NVIDIA RTX 3080", memory: "10GB", temperature: "72°C", utilization: "67%" },
    GpuModel { name: "NVIDIA RTX 3070", memory: "8GB", temperature: "68°C", utilization: "52%" },
    GpuModel { name: "NVIDIA A100", memory: "40GB", temperature: "58°C", utilization: "89%" },
    GpuModel { name: "NVIDIA RTX 4080", memory: "16GB", temperature: "63°C", utilization: "41%" },
];

const SYSTEMS: [SystemModel; 4] = [
    SystemModel { os: "Ubuntu 22.04 LTS", cpu: "Intel i9-13900K", ram: "64GB", uptime: "15d 4h 23m" },
    SystemModel { os: "Ubuntu 20.04 LTS", cpu: "AMD Ryzen 9 5900X", ram: "32GB", uptime: "8d 12h 45m" },
    SystemModel { os: "Ubuntu 22.04 LTS", cpu: "Intel i7-12700K", ram: "32GB", uptime: "3d 18h 12m" },
    SystemModel { os: "CentOS 8", cpu: "AMD Ryzen 7 5800X", ram: "48GB", uptime: "22d 6h 33m" },
];

pub fn gpu_for(address: Ipv4Addr) -> GpuInfo {
    let m = &GPUS[last_octet(address) as usize % GPUS.len()];
    GpuInfo {
        name: m.name.into(),
        memory: m.memory.into(),
        temperature: m.temperature.into(),
        utilization: m.utilization.into(),
    }
}

pub fn system_for(address: Ipv4Addr) -> SystemInfo {
    let m = &SYSTEMS[last_octet(address) as usize % SYSTEMS.len()];
    SystemInfo {
        os: m.os.into(),
        cpu: m.cpu.into(),
        ram: m.ram.into(),
        uptime: m.uptime.into(),
    }
}
