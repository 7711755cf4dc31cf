use super::error::DnsError;
use super::layout;
use super::reader::DnsReader;

/// Decoded DNS header plus question-section names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub is_query: bool,
    pub questions: Vec<String>,
}

/// Parse a DNS message carried as a UDP payload.
///
/// Only the header and question-section names are decoded; answer,
/// authority, and additional records are not needed by anything that
/// consumes this packet abstraction and are left undecoded.
pub fn parse_dns(payload: &[u8]) -> Result<Option<DnsMessage>, DnsError> {
    let reader = DnsReader::new(payload);
    if reader.len() < layout::HEADER_LEN {
        return Ok(None);
    }

    let flags = reader.read_u16_be(layout::FLAGS_RANGE)?;
    let is_query = flags & layout::QR_BIT == 0;
    let qdcount = reader.read_u16_be(layout::QDCOUNT_RANGE)?;

    let mut questions = Vec::new();
    let mut cursor = layout::HEADER_LEN;
    let decode_count = qdcount.min(layout::MAX_QUESTIONS_DECODED);
    for _ in 0..decode_count {
        let (name, end) = reader.read_name(cursor)?;
        // qtype (2) + qclass (2) follow the name.
        reader.require_len(end + 4)?;
        cursor = end + 4;
        questions.push(name);
    }

    Ok(Some(DnsMessage {
        is_query,
        questions,
    }))
}
