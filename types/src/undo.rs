use crate::ClassifiedKind;

/// A prevout recovered from undo data: what an input spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredPrevout {
    /// Height of the block that created the output.
    pub height: u32,
    pub is_coinbase: bool,
    pub amount_sats: u64,
    pub script_pubkey: Vec<u8>,
    pub kind: ClassifiedKind,
}

/// The undo payload for one block: one entry per non-coinbase transaction,
/// one inner entry per input, in block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoBlock {
    pub txs: Vec<Vec<RecoveredPrevout>>,
    /// Absolute file offset of the payload inside the `rev*.dat` file.
    pub file_offset: u64,
}
