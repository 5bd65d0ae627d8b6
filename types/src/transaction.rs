use crate::{display_hash, ClassifiedKind, Diagnostic};

/// A fully decoded transaction.
///
/// Built in a single decoder pass and read-only afterwards. Hash fields are
/// wire-ordered; the `*_hex` accessors produce display order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub version: i32,
    pub is_segwit: bool,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub locktime: u32,
    pub txid: [u8; 32],
    /// Absent for non-segwit transactions.
    pub wtxid: Option<[u8; 32]>,
    pub sizes: TxSizes,
    pub diagnostics: Vec<Diagnostic>,
}

impl TransactionRecord {
    pub fn txid_hex(&self) -> String {
        display_hash(&self.txid)
    }

    pub fn wtxid_hex(&self) -> Option<String> {
        self.wtxid.as_ref().map(display_hash)
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value_sats).sum()
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }
}

/// Serialized-size accounting for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSizes {
    pub total: usize,
    pub non_witness: usize,
    pub witness: usize,
    pub weight: usize,
    pub vbytes: usize,
}

impl TxSizes {
    /// Derives the weight family from the two measured byte counts.
    pub fn from_parts(non_witness: usize, witness: usize) -> Self {
        let weight = non_witness * 4 + witness;
        TxSizes {
            total: non_witness + witness,
            non_witness,
            witness,
            weight,
            vbytes: (weight + 3) / 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub script_sig: Vec<u8>,
    pub witness: Witness,
    pub sequence: u32,
}

impl Input {
    pub fn is_coinbase(&self) -> bool {
        self.prev_vout == u32::MAX && self.prev_txid == [0u8; 32]
    }

    pub fn prev_txid_hex(&self) -> String {
        display_hash(&self.prev_txid)
    }
}

/// Witness data attached to an input by BIP141.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    Legacy,
    Segwit(Vec<Vec<u8>>),
}

impl Witness {
    pub fn items(&self) -> &[Vec<u8>] {
        match self {
            Witness::Legacy => &[],
            Witness::Segwit(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub value_sats: u64,
    pub script_pubkey: Vec<u8>,
    pub kind: ClassifiedKind,
}
