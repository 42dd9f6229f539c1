use anyhow::Context;
use pnet::datalink::{self, NetworkInterface};
#[cfg(target_os = "linux")]
use linux_impl::is_wired;
#[cfg(not(target_os = "linux"))]
use fallback_impl::is_wired;

use crate::network::range::{FALLBACK_SUBNET, Subnet24};
use crate::utils::interface::NetworkInterfaceExtension;
use crate::warn;

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    #[error("interface is down")]
    IsDown,
    /// Loopback interfaces never reach the device.
    #[error("interface is a loopback")]
    IsLoopback,
    /// A point-to-point link, e.g. a VPN.
    #[error("interface is point-to-point")]
    IsPointToPoint,
    #[error("interface has no usable IPv4 address")]
    NoIpv4,
}

/// Finds the /24 of the primary LAN interface.
pub fn get_lan_subnet() -> anyhow::Result<Subnet24> {
    lan_subnet_from(datalink::interfaces())
}

/// Like [`get_lan_subnet`], but degrades to [`FALLBACK_SUBNET`] instead of failing.
pub fn detect_subnet() -> Subnet24 {
    subnet_from(datalink::interfaces())
}

pub fn subnet_from(interfaces: Vec<NetworkInterface>) -> Subnet24 {
    match lan_subnet_from(interfaces) {
        Ok(subnet) => subnet,
        Err(e) => {
            warn!("Could not determine local network ({e}), falling back to {FALLBACK_SUBNET}");
            FALLBACK_SUBNET
        }
    }
}

fn lan_subnet_from(interfaces: Vec<NetworkInterface>) -> anyhow::Result<Subnet24> {
    let interfaces: Vec<NetworkInterface> = interfaces
        .into_iter()
        .filter(|interface| match is_viable_lan_interface(interface) {
            Ok(()) => true,
            Err(reason) => {
                tracing::trace!(interface = %interface.name, "skipped: {reason}");
                false
            }
        })
        .collect();

    let interface: NetworkInterface = select_best_lan_interface(interfaces, is_wired)
        .context("No interfaces available for LAN discovery")?;

    let net = interface
        .get_lan_ipv4()
        .with_context(|| format!("{} has no usable IPv4 address", interface.name))?;

    Ok(Subnet24::from(net))
}

fn is_viable_lan_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    if interface.get_lan_ipv4().is_none() {
        return Err(ViabilityError::NoIpv4);
    }

    Ok(())
}

fn select_best_lan_interface(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    let has_private = |interface: &NetworkInterface| {
        interface
            .get_lan_ipv4()
            .is_some_and(|net| net.ip().is_private())
    };

    interfaces
        .iter()
        .find(|interface| has_private(interface) && is_wired(interface))
        .or_else(|| interfaces.iter().find(|interface| has_private(interface)))
        .or_else(|| interfaces.first())
        .cloned()
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_wired(interface: &NetworkInterface) -> bool {
        let sys = format!("/sys/class/net/{}", interface.name);
        Path::new(&format!("{sys}/device")).exists() && !Path::new(&format!("{sys}/wireless")).exists()
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback_impl {
    use super::*;

    pub fn is_wired(interface: &NetworkInterface) -> bool {
        interface.name.starts_with("en") || interface.name.starts_with("eth")
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
