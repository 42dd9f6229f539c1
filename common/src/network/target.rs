//! # Scan Target Model
//!
//! Which /24 a sweep covers. A target is either:
//! * The local LAN, detected from the interfaces at scan start.
//! * An explicit /24, given as CIDR (`10.0.0.0/24`) or as any address inside it.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::network::interface;
use crate::network::range::Subnet24;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Target {
    /// Scan the /24 of the primary local interface.
    #[default]
    Lan,
    /// Scan a fixed /24.
    Subnet { subnet: Subnet24 },
}

impl Target {
    /// Resolves the target to a concrete range. LAN detection never fails:
    /// it degrades to the fallback range.
    pub fn resolve(&self) -> Subnet24 {
        match self {
            Target::Lan => interface::detect_subnet(),
            Target::Subnet { subnet } => *subnet,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Lan => f.write_str("lan"),
            Target::Subnet { subnet } => write!(f, "{subnet}"),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Keyword**: "lan" (case-insensitive).
    /// * **Address**: any IPv4 address, meaning the /24 that contains it.
    /// * **CIDR**: "Network/24"; other prefix lengths are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("lan") {
            return Ok(Target::Lan);
        }

        if let Some(target) = parse_cidr(s)? {
            return Ok(target);
        }

        s.parse::<Ipv4Addr>()
            .map(|ip| Target::Subnet {
                subnet: Subnet24::containing(ip),
            })
            .map_err(|_| format!("invalid target: {s}"))
    }
}

fn parse_cidr(s: &str) -> Result<Option<Target>, String> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ip = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| format!("Invalid IP in CIDR '{ip_str}': {e}"))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| format!("Invalid prefix in CIDR '{prefix_str}': {e}"))?;

    if prefix != 24 {
        return Err(format!("only /24 networks can be swept, got /{prefix}"));
    }

    Ok(Some(Target::Subnet {
        subnet: Subnet24::containing(ip),
    }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
