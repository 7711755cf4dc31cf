use super::error::DnsError;
use super::layout;

pub struct DnsReader<'a> {
    payload: &'a [u8],
}

impl<'a> DnsReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DnsError> {
        if self.payload.len() < needed {
            return Err(DnsError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DnsError> {
        self.payload.get(offset).copied().ok_or(DnsError::TooShort {
            needed: offset + 1,
            actual: self.payload.len(),
        })
    }

    pub fn read_u16_be(&self, range: std::ops::Range<usize>) -> Result<u16, DnsError> {
        let bytes = self.read_slice(range)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], DnsError> {
        self.payload.get(range.clone()).ok_or(DnsError::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    /// Reads a (possibly compressed) domain name starting at `offset`,
    /// returning the decoded dotted name and the offset immediately past
    /// the name *as it appears at the read site* (not following any
    /// pointer jump), matching RFC 1035 §4.1.4 encoding.
    pub fn read_name(&self, offset: usize) -> Result<(String, usize), DnsError> {
        let mut labels = Vec::new();
        let mut cursor = offset;
        let mut end_of_name: Option<usize> = None;
        let mut jumps = 0usize;

        loop {
            let len_byte = self.read_u8(cursor)?;
            if len_byte == 0 {
                if end_of_name.is_none() {
                    end_of_name = Some(cursor + 1);
                }
                break;
            }
            if len_byte & layout::LABEL_POINTER_MASK == layout::LABEL_POINTER_MASK {
                if jumps >= layout::MAX_POINTER_JUMPS {
                    return Err(DnsError::MalformedName {
                        reason: "too many compression pointer jumps",
                    });
                }
                let lo = self.read_u8(cursor + 1)?;
                let pointer = (((len_byte & !layout::LABEL_POINTER_MASK) as usize) << 8) | lo as usize;
                if end_of_name.is_none() {
                    end_of_name = Some(cursor + 2);
                }
                if pointer >= cursor {
                    return Err(DnsError::MalformedName {
                        reason: "compression pointer does not point backward",
                    });
                }
                cursor = pointer;
                jumps += 1;
                continue;
            }
            if len_byte > layout::LABEL_MAX_LEN {
                return Err(DnsError::MalformedName {
                    reason: "label length exceeds maximum",
                });
            }
            let label_start = cursor + 1;
            let label_end = label_start + len_byte as usize;
            let bytes = self.read_slice(label_start..label_end)?;
            labels.push(String::from_utf8_lossy(bytes).into_owned());
            cursor = label_end;
        }

        Ok((labels.join("."), end_of_name.unwrap_or(cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::DnsReader;

    fn encode_name(labels: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for label in labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    #[test]
    fn read_plain_name() {
        let payload = encode_name(&["example", "com"]);
        let reader = DnsReader::new(&payload);
        let (name, end) = reader.read_name(0).unwrap();
        assert_eq!(name, "example.com");
        assert_eq!(end, payload.len());
    }

    #[test]
    fn read_compressed_name() {
        let mut payload = encode_name(&["example", "com"]);
        let base = payload.len();
        payload.extend_from_slice(&[3, b'w', b'w', b'w']);
        payload.push(0xc0);
        payload.push(0u8);
        let reader = DnsReader::new(&payload);
        let (name, end) = reader.read_name(base).unwrap();
        assert_eq!(name, "www.example.com");
        assert_eq!(end, payload.len());
    }

    #[test]
    fn pointer_must_point_backward() {
        let payload = [0xc0, 0x00];
        let reader = DnsReader::new(&payload);
        assert!(reader.read_name(0).is_err());
    }
}
