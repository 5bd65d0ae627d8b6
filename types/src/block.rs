use crate::{display_hash, TransactionRecord};

/// The fixed 80-byte block header, plus its own double-SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    pub block_hash: [u8; 32],
}

impl BlockHeader {
    pub fn block_hash_hex(&self) -> String {
        display_hash(&self.block_hash)
    }

    pub fn prev_block_hash_hex(&self) -> String {
        display_hash(&self.prev_block_hash)
    }

    pub fn merkle_root_hex(&self) -> String {
        display_hash(&self.merkle_root)
    }
}

/// One block decoded out of a `blk*.dat` region.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub header: BlockHeader,
    pub tx_count: u64,
    pub transactions: Vec<TransactionRecord>,
    /// Absolute file offset of each transaction's first byte.
    pub tx_offsets: Vec<u64>,
    pub merkle_root_computed: [u8; 32],
    pub merkle_ok: bool,
    /// BIP34 height from the coinbase scriptSig; absent for pre-BIP34 coinbases.
    pub coinbase_height: Option<u32>,
    /// Absolute file offset of the block payload (past magic and size).
    pub file_offset: u64,
    pub size: u64,
}

impl BlockRecord {
    pub fn non_coinbase_count(&self) -> usize {
        self.transactions.iter().filter(|tx| !tx.is_coinbase()).count()
    }
}
