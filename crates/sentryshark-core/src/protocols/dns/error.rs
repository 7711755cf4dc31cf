use thiserror::Error;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("malformed domain name: {reason}")]
    MalformedName { reason: &'static str },
}
