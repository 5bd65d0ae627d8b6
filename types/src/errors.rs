use std::fmt;

/// An error thrown when decoding an on-chain artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Used when the buffer ended in the middle of a field.
    Truncated { offset: usize, needed: usize },
    /// Used when the segwit marker byte is present but the flag byte is not `0x01`.
    InvalidMarkerFlag { offset: usize },
    /// Used when the input count exceeds the soft decoding cap.
    ExcessiveInputs { count: u64 },
    /// Used when the output count exceeds the soft decoding cap.
    ExcessiveOutputs { count: u64 },
    /// Used when bytes match no known script template where one is required.
    InvalidTemplate,
    /// Used when a Base58, Bech32, or varint encoding is violated.
    InvalidEncoding(String),
    /// Used when the witness section diverges from the input list or is
    /// otherwise malformed.
    InvalidWitness(String),
    /// Used when undo data diverges from the block it should pair with.
    UndoMismatch { block_side: usize, undo_side: usize },
    /// Used when the recomputed merkle root differs from the header.
    MerkleMismatch { computed: String, header: String },
    /// Used when script decompression produced no valid point on secp256k1.
    CurvePointInvalid,
    /// Used when a witness program is outside the accepted version/size bounds.
    UnsupportedWitnessVersion { version: u8, program_len: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { offset, needed } => {
                write!(f, "buffer ended at offset {offset}: {needed} more byte(s) required")
            }
            DecodeError::InvalidMarkerFlag { offset } => {
                write!(f, "invalid segwit marker/flag at offset {offset}")
            }
            DecodeError::ExcessiveInputs { count } => {
                write!(f, "input count {count} exceeds the decoding cap")
            }
            DecodeError::ExcessiveOutputs { count } => {
                write!(f, "output count {count} exceeds the decoding cap")
            }
            DecodeError::InvalidTemplate => {
                write!(f, "bytes match no known script template")
            }
            DecodeError::InvalidEncoding(what) => write!(f, "invalid encoding: {what}"),
            DecodeError::InvalidWitness(what) => write!(f, "invalid witness: {what}"),
            DecodeError::UndoMismatch { block_side, undo_side } => {
                write!(
                    f,
                    "undo/block divergence: {undo_side} undo entr(ies) against {block_side} on the block side"
                )
            }
            DecodeError::MerkleMismatch { computed, header } => {
                write!(f, "computed merkle root {computed} differs from header root {header}")
            }
            DecodeError::CurvePointInvalid => {
                write!(f, "x-coordinate has no square root on secp256k1")
            }
            DecodeError::UnsupportedWitnessVersion { version, program_len } => {
                write!(
                    f,
                    "witness program of {program_len} byte(s) is invalid for version {version}"
                )
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Non-fatal observations collected while decoding; surfaced as report warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// A CompactSize was accepted in a non-minimal encoding.
    NonCanonicalSize { offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offsets() {
        let err = DecodeError::Truncated { offset: 17, needed: 4 };
        assert_eq!(err.to_string(), "buffer ended at offset 17: 4 more byte(s) required");

        let err = DecodeError::InvalidMarkerFlag { offset: 4 };
        assert!(err.to_string().contains("offset 4"));
    }
}
