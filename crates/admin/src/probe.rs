//! HTTP reachability probe feeding the registry's discovery scans.
//!
//! Each scan probes the statically configured candidates plus every
//! address that registered through `POST /api/register`. A candidate is
//! reachable when its metrics endpoint answers with a 2xx status.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

use rf_domain::address::{last_octet, parse_private_ipv4};
use rf_domain::config::DiscoveryConfig;
use rf_registry::{CandidateSource, ScanCandidate};

use crate::directory::RenderDirectory;
use crate::render_client::RenderClient;

struct Target {
    hostname: String,
    services: Vec<String>,
}

pub struct HttpProbe {
    client: RenderClient,
    directory: Arc<RenderDirectory>,
    statics: BTreeMap<Ipv4Addr, Target>,
    metrics_path: String,
    render_port: AtomicU16,
}

impl HttpProbe {
    pub fn new(
        client: RenderClient,
        directory: Arc<RenderDirectory>,
        discovery: &DiscoveryConfig,
        render_port: u16,
    ) -> Self {
        let mut statics = BTreeMap::new();
        for candidate in &discovery.candidates {
            match parse_private_ipv4(&candidate.address) {
                Ok(address) => {
                    statics.insert(
                        address,
                        Target {
                            hostname: candidate.hostname.clone().unwrap_or_default(),
                            services: candidate.services.clone(),
                        },
                    );
                }
                Err(e) => tracing::warn!(error = %e, "skipping discovery candidate"),
            }
        }
        Self {
            client,
            directory,
            statics,
            metrics_path: discovery.metrics_path.clone(),
            render_port: AtomicU16::new(render_port),
        }
    }

    pub fn render_port(&self) -> u16 {
        self.render_port.load(Ordering::Relaxed)
    }

    /// Follow a VPC reconfiguration.
    pub fn set_render_port(&self, port: u16) {
        self.render_port.store(port, Ordering::Relaxed);
    }

    /// Everything one scan should probe, static entries first.
    fn targets(&self) -> Vec<(Ipv4Addr, String, Vec<String>)> {
        let mut targets: Vec<_> = self
            .statics
            .iter()
            .map(|(addr, t)| {
                let hostname = match t.hostname.trim() {
                    "" => default_hostname(*addr),
                    h => h.to_string(),
                };
                (*addr, hostname, t.services.clone())
            })
            .collect();
        for addr in self.directory.list() {
            if !self.statics.contains_key(&addr) {
                targets.push((addr, default_hostname(addr), default_services()));
            }
        }
        targets
    }
}

fn default_hostname(address: Ipv4Addr) -> String {
    format!("render-node-{}", last_octet(address))
}

fn default_services() -> Vec<String> {
    vec!["render-service".into(), "gpu-monitor".into()]
}

#[async_trait]
impl CandidateSource for HttpProbe {
    async fn scan(&self) -> rf_domain::Result<Vec<ScanCandidate>> {
        let port = self.render_port();
        let probes = self.targets().into_iter().map(|(address, hostname, services)| {
            let client = &self.client;
            let path = self.metrics_path.as_str();
            async move {
                let reachable = match client.check_metrics(address, port, path).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!(address = %address, error = %e, "probe failed");
                        false
                    }
                };
                ScanCandidate {
                    address,
                    hostname,
                    services,
                    reachable,
                }
            }
        });
        Ok(join_all(probes).await)
    }
}
