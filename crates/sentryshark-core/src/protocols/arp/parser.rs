use std::net::Ipv4Addr;

use super::error::ArpError;
use super::layout;
use super::reader::ArpReader;

/// Decoded Ethernet/IPv4 ARP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    pub op: u16,
    pub sender_mac: [u8; 6],
    pub sender_ip: Ipv4Addr,
    pub target_ip: Ipv4Addr,
}

/// Parse an ARP packet from an Ethernet frame's payload.
///
/// Returns `Ok(None)` for any hardware/protocol combination other than
/// Ethernet/IPv4, since those are the only layers the packet abstraction
/// exposes.
pub fn parse_arp(payload: &[u8]) -> Result<Option<ArpPacket>, ArpError> {
    let reader = ArpReader::new(payload);
    reader.require_len(layout::MIN_LEN)?;

    let hw_type = reader.read_u16_be(layout::HW_TYPE_RANGE)?;
    let proto_type = reader.read_u16_be(layout::PROTO_TYPE_RANGE)?;
    let hw_len = reader.read_u8(layout::HW_LEN_OFFSET)?;
    let proto_len = reader.read_u8(layout::PROTO_LEN_OFFSET)?;

    if hw_type != layout::HW_TYPE_ETHERNET
        || proto_type != layout::PROTO_TYPE_IPV4
        || hw_len != layout::HW_LEN_ETHERNET
        || proto_len != layout::PROTO_LEN_IPV4
    {
        return Ok(None);
    }

    let op = reader.read_u16_be(layout::OPCODE_RANGE)?;
    let sender_mac = reader.read_mac(layout::SENDER_MAC_RANGE)?;
    let sender_ip = reader.read_ipv4(layout::SENDER_IP_RANGE)?;
    let target_ip = reader.read_ipv4(layout::TARGET_IP_RANGE)?;

    Ok(Some(ArpPacket {
        op,
        sender_mac,
        sender_ip,
        target_ip,
    }))
}

#[cfg(test)]
mod tests {
    use super::parse_arp;
    use crate::protocols::arp::layout;

    fn build_arp(op: u16, sender_mac: [u8; 6], sender_ip: [u8; 4], target_ip: [u8; 4]) -> Vec<u8> {
        let mut payload = vec![0u8; layout::MIN_LEN];
        payload[layout::HW_TYPE_RANGE].copy_from_slice(&layout::HW_TYPE_ETHERNET.to_be_bytes());
        payload[layout::PROTO_TYPE_RANGE].copy_from_slice(&layout::PROTO_TYPE_IPV4.to_be_bytes());
        payload[layout::HW_LEN_OFFSET] = layout::HW_LEN_ETHERNET;
        payload[layout::PROTO_LEN_OFFSET] = layout::PROTO_LEN_IPV4;
        payload[layout::OPCODE_RANGE].copy_from_slice(&op.to_be_bytes());
        payload[layout::SENDER_MAC_RANGE].copy_from_slice(&sender_mac);
        payload[layout::SENDER_IP_RANGE].copy_from_slice(&sender_ip);
        payload[layout::TARGET_MAC_RANGE].copy_from_slice(&[0u8; 6]);
        payload[layout::TARGET_IP_RANGE].copy_from_slice(&target_ip);
        payload
    }

    #[test]
    fn parse_valid_request() {
        let payload = build_arp(
            layout::OPCODE_REQUEST,
            [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff],
            [10, 0, 0, 5],
            [10, 0, 0, 1],
        );
        let parsed = parse_arp(&payload).unwrap().unwrap();
        assert_eq!(parsed.op, layout::OPCODE_REQUEST);
        assert_eq!(parsed.sender_mac, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(parsed.sender_ip.octets(), [10, 0, 0, 5]);
        assert_eq!(parsed.target_ip.octets(), [10, 0, 0, 1]);
    }

    #[test]
    fn parse_gratuitous_reply() {
        let payload = build_arp(
            layout::OPCODE_REPLY,
            [1, 2, 3, 4, 5, 6],
            [10, 0, 0, 5],
            [10, 0, 0, 5],
        );
        let parsed = parse_arp(&payload).unwrap().unwrap();
        assert_eq!(parsed.sender_ip, parsed.target_ip);
    }

    #[test]
    fn parse_non_ethernet_ipv4_is_none() {
        let mut payload = build_arp(1, [0; 6], [0; 4], [0; 4]);
        payload[layout::HW_TYPE_RANGE].copy_from_slice(&6u16.to_be_bytes());
        assert!(parse_arp(&payload).unwrap().is_none());
    }

    #[test]
    fn parse_short_payload_errors() {
        let payload = vec![0u8; layout::MIN_LEN - 1];
        assert!(parse_arp(&payload).is_err());
    }
}
