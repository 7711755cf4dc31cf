use std::net::IpAddr;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;
use thiserror::Error;

use crate::protocols::arp::parse_arp;
use crate::protocols::dns::parse_dns;
use crate::source::PacketEvent;

use super::{ArpLayer, DnsLayer, IpLayer, Packet, TcpLayer, UdpLayer};

const DNS_PORT: u16 = 53;

/// Ethernet II header length; EtherType occupies the final two bytes.
const ETHERNET_HEADER_LEN: usize = 14;
const ETHERNET_TYPE_RANGE: std::ops::Range<usize> = 12..14;
const ETHER_TYPE_ARP: u16 = 0x0806;

#[derive(Debug, Error)]
pub enum PacketDecodeError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("packet has no usable timestamp")]
    MissingTimestamp,
}

/// Decodes a raw captured frame into the crate's owned `Packet` view.
///
/// Unrecognized link types, non-IP/ARP ethertypes, and layers this
/// abstraction doesn't model all decode successfully with the
/// corresponding accessor left absent — only a genuinely malformed,
/// recognized layer is an error.
pub fn decode_packet(event: &PacketEvent) -> Result<Packet, PacketDecodeError> {
    let mut packet = Packet::new(event.ts, event.data.len());

    match event.linktype {
        Linktype::ETHERNET => {
            if event.data.len() >= ETHERNET_HEADER_LEN {
                let ether_type =
                    u16::from_be_bytes([event.data[12], event.data[13]]);
                if ether_type == ETHER_TYPE_ARP {
                    if let Some(arp) = decode_arp(&event.data[ETHERNET_HEADER_LEN..])? {
                        packet = packet.with_arp(arp);
                    }
                    return Ok(packet);
                }
            }
            decode_ip_layers(&mut packet, &event.data, true)?;
        }
        Linktype::RAW => {
            decode_ip_layers(&mut packet, &event.data, false)?;
        }
        _ => {}
    }

    Ok(packet)
}

fn decode_arp(payload: &[u8]) -> Result<Option<ArpLayer>, PacketDecodeError> {
    match parse_arp(payload) {
        Ok(Some(arp)) => Ok(Some(ArpLayer {
            op: arp.op,
            psrc: arp.sender_ip,
            pdst: arp.target_ip,
            hwsrc: arp.sender_mac,
        })),
        Ok(None) => Ok(None),
        Err(err) => Err(PacketDecodeError::Slice(err.to_string())),
    }
}

fn decode_ip_layers(
    packet: &mut Packet,
    data: &[u8],
    ethernet: bool,
) -> Result<(), PacketDecodeError> {
    let sliced = if ethernet {
        SlicedPacket::from_ethernet(data)
    } else {
        SlicedPacket::from_ip(data)
    };
    let sliced = match sliced {
        Ok(sliced) => sliced,
        // A recognized link type whose payload isn't a decodable IP packet
        // (e.g. other ethertypes on an Ethernet frame) — not an error for a
        // packet abstraction that only models IP/TCP/UDP/ARP/DNS.
        Err(_) => return Ok(()),
    };

    let net = match sliced.net {
        Some(net) => net,
        None => return Ok(()),
    };

    let (src, dst, proto) = match &net {
        NetSlice::Ipv4(ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
            u8::from(ipv4.header().protocol()),
        ),
        NetSlice::Ipv6(ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
            u8::from(ipv6.header().next_header()),
        ),
    };
    packet.set_ip(IpLayer { src, dst, proto });

    let transport = match sliced.transport {
        Some(transport) => transport,
        None => return Ok(()),
    };

    match transport {
        TransportSlice::Tcp(tcp) => {
            packet.set_tcp(TcpLayer {
                sport: tcp.source_port(),
                dport: tcp.destination_port(),
            });
        }
        TransportSlice::Udp(udp) => {
            let sport = udp.source_port();
            let dport = udp.destination_port();
            packet.set_udp(UdpLayer { sport, dport });
            if sport == DNS_PORT || dport == DNS_PORT {
                if let Some(ip_payload) = net.ip_payload_ref() {
                    if ip_payload.payload.len() > 8 {
                        if let Ok(Some(dns)) = parse_dns(&ip_payload.payload[8..]) {
                            packet.set_dns(DnsLayer {
                                is_query: dns.is_query,
                                questions: dns.questions,
                            });
                        }
                    }
                }
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::decode_packet;
    use crate::source::PacketEvent;
    use etherparse::PacketBuilder;
    use pcap_parser::Linktype;

    #[test]
    fn decodes_udp_over_ethernet() {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 0, 1], [192, 168, 0, 2], 64)
            .udp(40000, 8080);
        let payload = [1, 2, 3, 4];
        let mut data = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut data, &payload).unwrap();

        let event = PacketEvent {
            ts: Some(1.0),
            linktype: Linktype::ETHERNET,
            data,
        };
        let packet = decode_packet(&event).unwrap();
        assert!(packet.ip().is_some());
        assert_eq!(packet.udp().unwrap().dport, 8080);
        assert!(packet.tcp().is_none());
        assert!(packet.arp().is_none());
    }

    #[test]
    fn decodes_arp_over_ethernet() {
        let mut data = vec![0u8; 14 + 28];
        data[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        data[14..16].copy_from_slice(&1u16.to_be_bytes()); // hw type ethernet
        data[16..18].copy_from_slice(&0x0800u16.to_be_bytes()); // proto type ipv4
        data[18] = 6;
        data[19] = 4;
        data[20..22].copy_from_slice(&1u16.to_be_bytes()); // request
        data[22..28].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        data[28..32].copy_from_slice(&[10, 0, 0, 1]);
        data[38..42].copy_from_slice(&[10, 0, 0, 2]);

        let event = PacketEvent {
            ts: Some(1.0),
            linktype: Linktype::ETHERNET,
            data,
        };
        let packet = decode_packet(&event).unwrap();
        let arp = packet.arp().unwrap();
        assert_eq!(arp.psrc.octets(), [10, 0, 0, 1]);
        assert_eq!(arp.pdst.octets(), [10, 0, 0, 2]);
        assert!(packet.ip().is_none());
    }

    #[test]
    fn non_ip_non_arp_ethertype_has_no_layers() {
        let mut data = vec![0u8; 20];
        data[12..14].copy_from_slice(&0x88ccu16.to_be_bytes()); // LLDP
        let event = PacketEvent {
            ts: Some(1.0),
            linktype: Linktype::ETHERNET,
            data,
        };
        let packet = decode_packet(&event).unwrap();
        assert!(packet.ip().is_none());
        assert!(packet.arp().is_none());
    }
}
