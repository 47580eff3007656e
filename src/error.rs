/// Top-level crate error.
///
/// Every failure is reported synchronously; nothing in this crate performs
/// I/O, so no variant is transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bit-string or fixed-width field does not have the required width.
    InvalidFieldWidth {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Value does not fit the representable range (varint or fixed field).
    ValueTooLarge { value: u64, max: u64 },
    /// Input ended before the required number of bytes.
    TruncatedInput { needed: usize, available: usize },
    /// No Initial salt is known for this version and no key override was given.
    UnsupportedVersion(u32),
    /// Key or nonce length did not match the AEAD suite.
    EncryptionFailure,
    /// AEAD authentication failed while opening a packet.
    DecryptionFailure,
    /// Caller-supplied hex could not be parsed.
    MalformedHex { field: &'static str },
    /// Caller-supplied bit string contains something other than `0` and `1`.
    MalformedBits { field: &'static str },
    /// Connection IDs are limited to 20 bytes.
    ConnectionIdTooLong(usize),
    /// The packet to open does not carry a long header.
    NotLongHeader,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidFieldWidth {
                field,
                expected,
                actual,
            } => write!(f, "{field}: expected width {expected}, got {actual}"),
            Error::ValueTooLarge { value, max } => {
                write!(f, "value {value} exceeds maximum {max}")
            }
            Error::TruncatedInput { needed, available } => {
                write!(f, "truncated input, need {needed} bytes, have {available}")
            }
            Error::UnsupportedVersion(v) => {
                write!(f, "unsupported version {v:#010x} (no initial salt known)")
            }
            Error::EncryptionFailure => write!(f, "packet encryption failed"),
            Error::DecryptionFailure => write!(f, "packet decryption failed"),
            Error::MalformedHex { field } => write!(f, "{field}: malformed hex"),
            Error::MalformedBits { field } => write!(f, "{field}: not a bit string"),
            Error::ConnectionIdTooLong(len) => {
                write!(f, "connection id of {len} bytes exceeds 20 bytes")
            }
            Error::NotLongHeader => write!(f, "not a long header packet"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::InvalidFieldWidth {
                field: "packet_type",
                expected: 2,
                actual: 3
            }
            .to_string(),
            "packet_type: expected width 2, got 3"
        );
        assert_eq!(
            Error::UnsupportedVersion(0x1a2a3a4a).to_string(),
            "unsupported version 0x1a2a3a4a (no initial salt known)"
        );
        assert_eq!(
            Error::MalformedHex { field: "dcid" }.to_string(),
            "dcid: malformed hex"
        );
    }
}
