use std::net::IpAddr;

use super::Packet;

/// Port placeholder used in a flow key when the transport layer carries no
/// port (non-TCP/UDP traffic).
const NO_PORT: &str = "-";

/// Canonical bidirectional flow key: `"ipA-ipB:portA-portB:proto"`, with the
/// lexicographically smaller IP address ordered first and ports swapped to
/// match, so that either direction of a flow maps to the same key.
pub fn flow_key(
    src_ip: IpAddr,
    dst_ip: IpAddr,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    proto: &str,
) -> String {
    let src_ip_s = src_ip.to_string();
    let dst_ip_s = dst_ip.to_string();

    let (ip_a, ip_b, port_a, port_b) = if src_ip_s <= dst_ip_s {
        (src_ip_s, dst_ip_s, src_port, dst_port)
    } else {
        (dst_ip_s, src_ip_s, dst_port, src_port)
    };

    let port_a = port_a.map(|p| p.to_string()).unwrap_or_else(|| NO_PORT.to_string());
    let port_b = port_b.map(|p| p.to_string()).unwrap_or_else(|| NO_PORT.to_string());

    format!("{ip_a}-{ip_b}:{port_a}-{port_b}:{proto}")
}

/// Derives the flow key for a decoded packet, defined only when an IP layer
/// is present.
pub fn flow_key_for_packet(packet: &Packet) -> Option<String> {
    let ip = packet.ip()?;
    let proto = if packet.tcp().is_some() {
        "tcp"
    } else if packet.udp().is_some() {
        "udp"
    } else {
        "ip"
    };
    Some(flow_key(
        ip.src,
        ip.dst,
        packet.src_port(),
        packet.dst_port(),
        proto,
    ))
}
