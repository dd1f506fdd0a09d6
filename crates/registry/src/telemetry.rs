//! Synthetic telemetry for online nodes.
//!
//! Each heartbeat tick moves CPU, GPU and memory utilisation by a bounded
//! random step and derives the GPU temperature from GPU utilisation.
//! Everything draws from the caller's random source, so a seeded RNG
//! reproduces the exact same sequence.

use chrono::{DateTime, Utc};
use rand::Rng;
use rf_domain::node::{NodeMetrics, NodeRecord};

struct Walk {
    step: f64,
    min: f64,
    max: f64,
}

const CPU: Walk = Walk { step: 10.0, min: 5.0, max: 95.0 };
const GPU: Walk = Walk { step: 15.0, min: 10.0, max: 100.0 };
const MEMORY: Walk = Walk { step: 5.0, min: 15.0, max: 90.0 };

const BASE_TEMP_C: f64 = 45.0;
const TEMP_SPAN_C: f64 = 30.0;
const TEMP_JITTER_C: f64 = 5.0;

impl Walk {
    /// One step of width `step` centred on `current`, clamped to `[min, max]`.
    fn next<R: Rng + ?Sized>(&self, current: u8, rng: &mut R) -> u8 {
        let delta = (rng.gen::<f64>() - 0.5) * self.step;
        (f64::from(current) + delta).clamp(self.min, self.max).round() as u8
    }
}

/// Starting metrics for a freshly discovered node.
pub fn initial_metrics<R: Rng + ?Sized>(rng: &mut R) -> NodeMetrics {
    let memory_gb: f64 = rng.gen_range(8.0..28.0);
    NodeMetrics {
        cpu_usage: rng.gen_range(10..90),
        gpu_usage: rng.gen_range(5..95),
        memory_usage_gb: (memory_gb * 10.0).round() / 10.0,
        memory_usage_percent: rng.gen_range(20..90),
        disk_usage: rng.gen_range(30..90),
    }
}

/// GPU temperature in whole degrees for a given utilisation percentage.
pub fn gpu_temperature<R: Rng + ?Sized>(gpu_usage: u8, rng: &mut R) -> u8 {
    let t = BASE_TEMP_C
        + f64::from(gpu_usage) / 100.0 * TEMP_SPAN_C
        + rng.gen::<f64>() * TEMP_JITTER_C;
    t.round() as u8
}

/// Apply one refresh step to `record` and stamp `last_seen`.
pub fn refresh<R: Rng + ?Sized>(record: &mut NodeRecord, rng: &mut R, now: DateTime<Utc>) {
    let m = &mut record.metrics;
    m.cpu_usage = CPU.next(m.cpu_usage, rng);
    m.gpu_usage = GPU.next(m.gpu_usage, rng);
    m.memory_usage_percent = MEMORY.next(m.memory_usage_percent, rng);

    let temp = gpu_temperature(m.gpu_usage, rng);
    record.gpu.temperature = format!("{temp}°C");
    record.gpu.utilization = format!("{}%", m.gpu_usage);
    record.last_seen = now;
}
