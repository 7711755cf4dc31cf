//! Constants describing the PCAP/PCAPNG container formats.

/// Byte length of the reader's internal refill buffer.
pub const PCAP_READER_BUFFER_SIZE: usize = 65536;

/// Magic bytes identifying a PCAPNG section header block, little-endian byte order.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
