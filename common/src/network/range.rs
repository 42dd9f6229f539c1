use std::fmt;
use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

/// Range used when no local interface can be determined.
pub const FALLBACK_SUBNET: Subnet24 = Subnet24::new([192, 168, 1]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            0
        } else {
            (end - start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A /24 network identified by its first three octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet24 {
    prefix: [u8; 3],
}

impl Subnet24 {
    pub const fn new(prefix: [u8; 3]) -> Self {
        Self { prefix }
    }

    pub fn containing(ip: Ipv4Addr) -> Self {
        let [a, b, c, _] = ip.octets();
        Self::new([a, b, c])
    }

    pub fn network(&self) -> Ipv4Addr {
        let [a, b, c] = self.prefix;
        Ipv4Addr::new(a, b, c, 0)
    }

    /// Host octets 1 through 254; network and broadcast are skipped.
    pub fn hosts(&self) -> Ipv4Range {
        let [a, b, c] = self.prefix;
        Ipv4Range::new(Ipv4Addr::new(a, b, c, 1), Ipv4Addr::new(a, b, c, 254))
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        Self::containing(ip) == *self
    }
}

impl From<Ipv4Network> for Subnet24 {
    fn from(net: Ipv4Network) -> Self {
        Self::containing(net.ip())
    }
}

impl fmt::Display for Subnet24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/24", self.network())
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
