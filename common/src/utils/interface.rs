use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn get_lan_ipv4(&self) -> Option<Ipv4Network>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    /// First non-loopback IPv4, private addresses preferred.
    fn get_lan_ipv4(&self) -> Option<Ipv4Network> {
        let nets: Vec<Ipv4Network> = self
            .get_ipv4_nets()
            .into_iter()
            .filter(|net| !net.ip().is_loopback() && !net.ip().is_unspecified())
            .collect();

        nets.iter()
            .find(|net| net.ip().is_private())
            .or_else(|| nets.first())
            .copied()
    }
}
