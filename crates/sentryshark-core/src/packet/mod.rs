//! Uniform accessor over a decoded packet.
//!
//! Every packet owns its decoded layers outright (not borrowed from the
//! source buffer) so it can be held by the window processor, handed to the
//! analyzer, and lent to detectors across a window's lifetime without
//! tying detector state to the capture reader's buffer lifetime.

pub mod decode;
pub mod flow;

use std::net::IpAddr;

pub use decode::decode_packet;
pub use flow::{flow_key, flow_key_for_packet};

/// IP-layer view: source/destination address and IP protocol number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpLayer {
    pub src: IpAddr,
    pub dst: IpAddr,
    pub proto: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpLayer {
    pub sport: u16,
    pub dport: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpLayer {
    pub sport: u16,
    pub dport: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpLayer {
    pub op: u16,
    pub psrc: std::net::Ipv4Addr,
    pub pdst: std::net::Ipv4Addr,
    pub hwsrc: [u8; 6],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsLayer {
    pub is_query: bool,
    pub questions: Vec<String>,
}

/// A fully decoded packet, owned independently of the capture source.
#[derive(Debug, Clone)]
pub struct Packet {
    pub timestamp: Option<f64>,
    pub length: usize,
    ip: Option<IpLayer>,
    tcp: Option<TcpLayer>,
    udp: Option<UdpLayer>,
    arp: Option<ArpLayer>,
    dns: Option<DnsLayer>,
}

impl Packet {
    pub fn new(timestamp: Option<f64>, length: usize) -> Self {
        Self {
            timestamp,
            length,
            ip: None,
            tcp: None,
            udp: None,
            arp: None,
            dns: None,
        }
    }

    pub fn with_ip(mut self, ip: IpLayer) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_tcp(mut self, tcp: TcpLayer) -> Self {
        self.tcp = Some(tcp);
        self
    }

    pub fn with_udp(mut self, udp: UdpLayer) -> Self {
        self.udp = Some(udp);
        self
    }

    pub fn with_arp(mut self, arp: ArpLayer) -> Self {
        self.arp = Some(arp);
        self
    }

    pub fn with_dns(mut self, dns: DnsLayer) -> Self {
        self.dns = Some(dns);
        self
    }

    pub fn set_ip(&mut self, ip: IpLayer) {
        self.ip = Some(ip);
    }

    pub fn set_tcp(&mut self, tcp: TcpLayer) {
        self.tcp = Some(tcp);
    }

    pub fn set_udp(&mut self, udp: UdpLayer) {
        self.udp = Some(udp);
    }

    pub fn set_dns(&mut self, dns: DnsLayer) {
        self.dns = Some(dns);
    }

    pub fn ip(&self) -> Option<&IpLayer> {
        self.ip.as_ref()
    }

    pub fn tcp(&self) -> Option<&TcpLayer> {
        self.tcp.as_ref()
    }

    pub fn udp(&self) -> Option<&UdpLayer> {
        self.udp.as_ref()
    }

    pub fn arp(&self) -> Option<&ArpLayer> {
        self.arp.as_ref()
    }

    pub fn dns(&self) -> Option<&DnsLayer> {
        self.dns.as_ref()
    }

    /// The destination transport port, for whichever of TCP/UDP is present.
    pub fn dst_port(&self) -> Option<u16> {
        self.tcp
            .map(|t| t.dport)
            .or_else(|| self.udp.map(|u| u.dport))
    }

    /// The source transport port, for whichever of TCP/UDP is present.
    pub fn src_port(&self) -> Option<u16> {
        self.tcp
            .map(|t| t.sport)
            .or_else(|| self.udp.map(|u| u.sport))
    }
}
