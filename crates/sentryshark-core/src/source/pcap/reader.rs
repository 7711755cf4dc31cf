use std::io::{Read, Seek, SeekFrom};

use pcap_parser::Linktype;

use super::error::PcapSourceError;
use super::layout;

pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Resolves the linktype for a PCAPNG enhanced packet block given the
/// interface descriptions seen so far in the section.
///
/// Falls back to Ethernet when the interface id is out of range, which can
/// happen if an Enhanced Packet Block arrives before its Interface
/// Description Block has been consumed (not expected in well-formed
/// captures, but cheaper to tolerate than to fail the whole stream over).
pub fn linktype_for_interface(linktypes: &[Linktype], if_id: u32) -> Linktype {
    linktypes
        .get(if_id as usize)
        .copied()
        .unwrap_or(Linktype::ETHERNET)
}

/// Converts a PCAPNG 64-bit split timestamp (`ts_high`/`ts_low`, microsecond
/// resolution per the Enhanced Packet Block default) into fractional seconds.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32) -> f64 {
    let ticks = ((ts_high as u64) << 32) | ts_low as u64;
    ticks as f64 * 1e-6
}
