//! IPv4 CIDR ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::RiskError;

/// An IPv4 network in `a.b.c.d/len` notation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Cidr {
    /// Build a range; host bits of `network` are ignored. `prefix_len` is
    /// capped at 32.
    pub const fn new(network: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = if prefix_len > 32 { 32 } else { prefix_len };
        Self {
            network,
            prefix_len,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let mask = self.mask();
        u32::from(ip) & mask == u32::from(self.network) & mask
    }

    fn mask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            n => u32::MAX << (32 - u32::from(n)),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = Ipv4Addr::from(u32::from(self.network) & self.mask());
        write!(f, "{masked}/{}", self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = RiskError;

    /// Accepts `a.b.c.d/len` or a bare address (a /32).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RiskError::InvalidCidr(s.to_string());
        let (addr, len) = match s.trim().split_once('/') {
            Some((addr, len)) => (addr, len.parse::<u8>().map_err(|_| invalid())?),
            None => (s.trim(), 32),
        };
        if len > 32 {
            return Err(invalid());
        }
        let network = addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        Ok(Self::new(network, len))
    }
}

impl TryFrom<String> for Cidr {
    type Error = RiskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Cidr> for String {
    fn from(c: Cidr) -> Self {
        c.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_respects_prefix() {
        let range: Cidr = "91.0.0.0/8".parse().unwrap();
        assert!(range.contains(Ipv4Addr::new(91, 200, 1, 1)));
        assert!(!range.contains(Ipv4Addr::new(92, 0, 0, 1)));

        let narrow: Cidr = "5.255.0.0/16".parse().unwrap();
        assert!(narrow.contains(Ipv4Addr::new(5, 255, 3, 4)));
        assert!(!narrow.contains(Ipv4Addr::new(5, 254, 3, 4)));
    }

    #[test]
    fn zero_prefix_matches_everything() {
        let all: Cidr = "0.0.0.0/0".parse().unwrap();
        assert!(all.contains(Ipv4Addr::new(203, 0, 113, 9)));
    }

    #[test]
    fn bare_address_is_a_host_route() {
        let host: Cidr = "203.0.113.9".parse().unwrap();
        assert_eq!(host.prefix_len(), 32);
        assert!(host.contains(Ipv4Addr::new(203, 0, 113, 9)));
        assert!(!host.contains(Ipv4Addr::new(203, 0, 113, 10)));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "91/8", "1.2.3.4/33", "1.2.3.4/x", "::1/128"] {
            assert!(bad.parse::<Cidr>().is_err(), "{bad}");
        }
    }

    #[test]
    fn displays_masked_network() {
        let c: Cidr = "178.12.34.56/8".parse().unwrap();
        assert_eq!(c.to_string(), "178.0.0.0/8");
    }

    #[test]
    fn serializes_as_string() {
        let c = Cidr::new(Ipv4Addr::new(23, 129, 0, 0), 16);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"23.129.0.0/16\"");
        let back: Cidr = serde_json::from_str("\"23.129.0.0/16\"").unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<Cidr>("\"nope\"").is_err());
    }
}
