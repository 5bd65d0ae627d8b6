mod block;
mod errors;
mod script;
mod transaction;
mod undo;

pub use crate::block::{BlockHeader, BlockRecord};
pub use crate::errors::{DecodeError, Diagnostic};
pub use crate::script::{ClassifiedKind, LockTimeKind, RelativeLock};
pub use crate::transaction::{Input, Output, TransactionRecord, TxSizes, Witness};
pub use crate::undo::{RecoveredPrevout, UndoBlock};

/// Network selector for address derivation (Base58 version bytes, Bech32 HRP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

/// Hex of a 32-byte digest in display order.
///
/// Hash fields are stored wire-ordered; user-facing output reverses them.
pub fn display_hash(digest: &[u8; 32]) -> String {
    let mut bytes = *digest;
    bytes.reverse();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_hash_reverses_wire_order() {
        let mut digest = [0u8; 32];
        digest[0] = 0xab;
        digest[31] = 0x01;
        let hex = display_hash(&digest);
        assert!(hex.starts_with("01"));
        assert!(hex.ends_with("ab"));
    }
}
