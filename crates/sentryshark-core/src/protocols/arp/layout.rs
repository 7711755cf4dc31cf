//! Byte layout of an Ethernet/IPv4 ARP packet (RFC 826), as carried directly
//! in an Ethernet frame's payload (EtherType 0x0806).

pub const HW_TYPE_RANGE: std::ops::Range<usize> = 0..2;
pub const PROTO_TYPE_RANGE: std::ops::Range<usize> = 2..4;
pub const HW_LEN_OFFSET: usize = 4;
pub const PROTO_LEN_OFFSET: usize = 5;
pub const OPCODE_RANGE: std::ops::Range<usize> = 6..8;
pub const SENDER_MAC_RANGE: std::ops::Range<usize> = 8..14;
pub const SENDER_IP_RANGE: std::ops::Range<usize> = 14..18;
pub const TARGET_MAC_RANGE: std::ops::Range<usize> = 18..24;
pub const TARGET_IP_RANGE: std::ops::Range<usize> = 24..28;

pub const HW_TYPE_ETHERNET: u16 = 1;
pub const PROTO_TYPE_IPV4: u16 = 0x0800;
pub const HW_LEN_ETHERNET: u8 = 6;
pub const PROTO_LEN_IPV4: u8 = 4;

pub const OPCODE_REQUEST: u16 = 1;
pub const OPCODE_REPLY: u16 = 2;

pub const MIN_LEN: usize = TARGET_IP_RANGE.end;
