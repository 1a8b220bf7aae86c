//! IP 地址段匹配与私有地址判定。

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// CIDR 地址段；不带前缀长度的地址视为单主机。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: IpAddr,
    prefix: u8,
}

impl CidrBlock {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (address, prefix) = match value.split_once('/') {
            Some((address, prefix)) => (address, Some(prefix.parse::<u8>().ok()?)),
            None => (value, None),
        };
        let network: IpAddr = address.parse().ok()?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix = prefix.unwrap_or(max);
        if prefix > max {
            return None;
        }
        Some(Self { network, prefix })
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(ip)) => {
                let mask = mask_v4(self.prefix);
                u32::from(network) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(ip)) => {
                let mask = mask_v6(self.prefix);
                u128::from(network) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

fn mask_v4(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_v6(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

/// RFC1918 / 回环 / 链路本地（IPv6 另含 ULA fc00::/7）。
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_private_v4(ip),
        IpAddr::V6(ip) => is_private_v6(ip),
    }
}

fn is_private_v4(ip: &Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}

fn is_private_v6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_v4(&mapped);
    }
    ip.is_loopback() || ip.is_unique_local() || ip.is_unicast_link_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(value: &str) -> IpAddr {
        value.parse().expect("ip")
    }

    #[test]
    fn v4_prefix_membership() {
        let block = CidrBlock::parse("10.0.0.0/8").expect("cidr");
        assert!(block.contains(&ip("10.255.1.1")));
        assert!(!block.contains(&ip("11.0.0.1")));
        assert!(!block.contains(&ip("::1")));
        assert!(CidrBlock::parse("0.0.0.0/0").expect("cidr").contains(&ip("8.8.8.8")));
    }

    #[test]
    fn bare_address_is_single_host() {
        let block = CidrBlock::parse("fe80::1").expect("cidr");
        assert!(block.contains(&ip("fe80::1")));
        assert!(!block.contains(&ip("fe80::2")));
    }

    #[test]
    fn malformed_blocks_are_rejected() {
        assert!(CidrBlock::parse("10.0.0.0/33").is_none());
        assert!(CidrBlock::parse("not-an-ip/8").is_none());
    }

    #[test]
    fn private_classification() {
        assert!(is_private_ip(&ip("192.168.1.10")));
        assert!(is_private_ip(&ip("172.16.0.1")));
        assert!(is_private_ip(&ip("127.0.0.1")));
        assert!(is_private_ip(&ip("169.254.10.1")));
        assert!(is_private_ip(&ip("fd00::1")));
        assert!(is_private_ip(&ip("::ffff:10.0.0.1")));
        assert!(!is_private_ip(&ip("8.8.8.8")));
        assert!(!is_private_ip(&ip("2001:4860::8888")));
    }
}
