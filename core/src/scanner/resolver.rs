//! Collapses sweep hits into one device per host and picks the auto-detected one.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use motorlink_common::device::DiscoveredDevice;

use super::sweep::Hit;

/// Host-unique devices in sweep order, plus the index of the selected one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub devices: Vec<DiscoveredDevice>,
    pub selected: Option<usize>,
}

impl Resolution {
    pub fn selected(&self) -> Option<&DiscoveredDevice> {
        self.selected.and_then(|idx| self.devices.get(idx))
    }
}

/// The first hit per host wins. Selection is the first surviving device.
pub fn resolve<I>(hits: I) -> Resolution
where
    I: IntoIterator<Item = Hit>,
{
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();
    let devices: Vec<DiscoveredDevice> = hits
        .into_iter()
        .filter(|hit| seen.insert(hit.host))
        .map(|hit| DiscoveredDevice {
            ip: hit.host,
            endpoint: hit.endpoint.path,
            method: hit.endpoint.method,
            response: hit.response.body,
        })
        .collect();

    let selected = if devices.is_empty() { None } else { Some(0) };

    Resolution { devices, selected }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
