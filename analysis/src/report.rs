//! Serialized report shapes. Field names and nullability are the external
//! contract; optional object fields are omitted, nullable scalars emit
//! `null`.

use crate::policy::Warning;
use chain_lens_types::ClassifiedKind;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TxReport {
    pub txid: String,
    pub wtxid: Option<String>,
    pub version: i32,
    pub is_segwit: bool,
    pub locktime: u32,
    pub sizes: SizesReport,
    pub inputs: Vec<InputReport>,
    pub outputs: Vec<OutputReport>,
    pub fees: FeesReport,
    pub locktime_kind: &'static str,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SizesReport {
    pub total_size: usize,
    pub non_witness_size: usize,
    pub witness_size: usize,
    pub weight: usize,
    pub vbytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub prev_txid: String,
    pub prev_vout: u32,
    pub sequence: u32,
    pub classified_kind: ClassifiedKind,
    pub script_sig_asm: String,
    pub witness: Vec<String>,
    pub rbf_signals: bool,
    pub relative_timelock: Option<RelativeTimelockReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevout: Option<PrevoutReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelativeTimelockReport {
    pub kind: &'static str,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrevoutReport {
    pub value: u64,
    pub kind: ClassifiedKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputReport {
    pub index: usize,
    pub value_sats: u64,
    pub classified_kind: ClassifiedKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub script_pubkey_hex: String,
    pub script_pubkey_asm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op_return: Option<OpReturnReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpReturnReport {
    pub data_hex: String,
    pub data_utf8: Option<String>,
    pub protocol: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeesReport {
    pub absolute_sats: Option<u64>,
    pub rate_sat_per_vb: Option<f64>,
    pub segwit_savings_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub file: String,
    pub offset: u64,
    pub size: u64,
    pub header: HeaderReport,
    pub tx_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinbase_height: Option<u32>,
    pub merkle_ok: bool,
    pub merkle_root_computed: String,
    pub tx_summary: Vec<TxSummaryReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub version: i32,
    pub block_hash: String,
    pub prev_block_hash: String,
    pub merkle_root: String,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxSummaryReport {
    pub index: usize,
    pub txid: String,
    pub total_out_sats: u64,
    pub fee_sats: Option<u64>,
    pub weight: usize,
    /// Distinct output kinds, first-appearance order.
    pub kinds: Vec<ClassifiedKind>,
}
