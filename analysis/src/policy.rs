//! Policy-level reading of decoded transactions: fees, replaceability,
//! timelocks, witness savings, and warning emission.

use chain_lens_types::{
    ClassifiedKind, Diagnostic, LockTimeKind, RelativeLock, TransactionRecord,
};
use serde::Serialize;

/// Fee rate above which a HIGH_FEE warning fires (sat/vB).
pub const HIGH_FEE_RATE_SAT_VB: f64 = 1000.0;

/// Locktime values below this are block heights, at or above it timestamps.
const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequences at or above this value do not signal BIP125 replaceability.
const BIP125_FINAL: u32 = 0xffff_fffe;

const SEQUENCE_DISABLE_BIT: u32 = 1 << 31;
const SEQUENCE_TIME_BIT: u32 = 1 << 22;

/// A structured report warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub detail: String,
}

/// The policy pass over one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAnalysis {
    /// Absent whenever any prevout value is unknown.
    pub fee_sats: Option<u64>,
    pub fee_rate_sat_vb: Option<f64>,
    pub rbf: bool,
    pub locktime_kind: LockTimeKind,
    /// One entry per input; `None` when bit 31 disables the relative lock.
    pub relative_locks: Vec<Option<RelativeLock>>,
    /// Absent for non-segwit transactions.
    pub segwit_savings_pct: Option<f64>,
    pub warnings: Vec<Warning>,
}

/// Runs the policy pass. `prevout_values`, when present, must hold one value
/// per input in input order.
pub fn analyze(tx: &TransactionRecord, prevout_values: Option<&[u64]>) -> PolicyAnalysis {
    let fee_sats = prevout_values.and_then(|values| {
        let inflow: u64 = values.iter().sum();
        inflow.checked_sub(tx.total_output_value())
    });
    let fee_rate_sat_vb = fee_sats.map(|fee| round2(fee as f64 / tx.sizes.vbytes as f64));

    let rbf = tx.inputs.iter().any(|input| signals_rbf(input.sequence));
    let relative_locks = tx.inputs.iter().map(|input| decode_sequence(input.sequence)).collect();

    let segwit_savings_pct = if tx.is_segwit {
        let weight_if_legacy = (tx.sizes.total * 4) as f64;
        Some(round2((1.0 - tx.sizes.weight as f64 / weight_if_legacy) * 100.0))
    } else {
        None
    };

    let mut warnings = Vec::new();
    if let Some(rate) = fee_rate_sat_vb {
        if rate > HIGH_FEE_RATE_SAT_VB {
            warnings.push(Warning {
                code: "HIGH_FEE",
                detail: format!("fee rate of {rate} sat/vB"),
            });
        }
    }
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.kind == ClassifiedKind::Unknown {
            warnings.push(Warning {
                code: "UNKNOWN_OUTPUT_SCRIPT",
                detail: format!("output {index} matches no known template"),
            });
        }
        if let Some(threshold) = dust_threshold(output.kind) {
            if output.value_sats < threshold {
                warnings.push(Warning {
                    code: "DUST_OUTPUT",
                    detail: format!(
                        "output {index} pays {} sat, below the {threshold} sat relay threshold",
                        output.value_sats
                    ),
                });
            }
        }
    }
    if rbf {
        warnings.push(Warning {
            code: "RBF_SIGNALING",
            detail: "at least one input signals BIP125 replaceability".to_string(),
        });
    }
    for diagnostic in &tx.diagnostics {
        let Diagnostic::NonCanonicalSize { offset } = diagnostic;
        warnings.push(Warning {
            code: "NON_CANONICAL_SIZE",
            detail: format!("compact size at offset {offset} is not minimally encoded"),
        });
    }

    PolicyAnalysis {
        fee_sats,
        fee_rate_sat_vb,
        rbf,
        locktime_kind: classify_locktime(tx.locktime),
        relative_locks,
        segwit_savings_pct,
        warnings,
    }
}

/// BIP125: a sequence strictly below 0xFFFFFFFE opts in to replacement.
pub fn signals_rbf(sequence: u32) -> bool {
    sequence < BIP125_FINAL
}

pub fn classify_locktime(locktime: u32) -> LockTimeKind {
    if locktime == 0 {
        LockTimeKind::None
    } else if locktime < LOCKTIME_THRESHOLD {
        LockTimeKind::Height(locktime)
    } else {
        LockTimeKind::UnixTime(locktime)
    }
}

/// BIP68 relative-lock decode: bit 31 disables, bit 22 selects 512-second
/// units over the low 16 bits.
pub fn decode_sequence(sequence: u32) -> Option<RelativeLock> {
    if sequence & SEQUENCE_DISABLE_BIT != 0 {
        return None;
    }
    let low = (sequence & 0xffff) as u16;
    if sequence & SEQUENCE_TIME_BIT != 0 {
        Some(RelativeLock::Time { seconds: low as u32 * 512 })
    } else {
        Some(RelativeLock::Blocks(low))
    }
}

/// Per-type dust relay thresholds in sats. OP_RETURN outputs are prunable
/// and exempt.
fn dust_threshold(kind: ClassifiedKind) -> Option<u64> {
    match kind {
        ClassifiedKind::P2pkh
        | ClassifiedKind::P2sh
        | ClassifiedKind::P2pk
        | ClassifiedKind::Multisig
        | ClassifiedKind::Unknown => Some(546),
        ClassifiedKind::P2wpkh => Some(294),
        ClassifiedKind::P2wsh | ClassifiedKind::P2tr => Some(330),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_lens_codec::decode_transaction;
    use chain_lens_test_utils::{scripts, TestInput, TransactionBuilder};

    fn decode(builder: &TransactionBuilder) -> TransactionRecord {
        decode_transaction(&builder.build()).unwrap()
    }

    fn codes(analysis: &PolicyAnalysis) -> Vec<&'static str> {
        analysis.warnings.iter().map(|w| w.code).collect()
    }

    #[test]
    fn fee_requires_every_prevout() {
        let tx = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(90_000, scripts::p2pkh(&[0x11; 20])),
        );

        let with = analyze(&tx, Some(&[100_000]));
        assert_eq!(with.fee_sats, Some(10_000));
        assert!(with.fee_rate_sat_vb.unwrap() > 0.0);

        let without = analyze(&tx, None);
        assert_eq!(without.fee_sats, None);
        assert_eq!(without.fee_rate_sat_vb, None);
    }

    #[test]
    fn fee_rate_rounds_to_two_decimals() {
        let tx = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(90_000, scripts::p2pkh(&[0x11; 20])),
        );
        let analysis = analyze(&tx, Some(&[90_000 + 1_000]));
        let rate = analysis.fee_rate_sat_vb.unwrap();
        assert_eq!(rate, (rate * 100.0).round() / 100.0);
    }

    #[test]
    fn rbf_signaling_threshold_is_fffffffe() {
        for (sequence, expected) in [
            (0xffff_ffff_u32, false),
            (0xffff_fffe, false),
            (0xffff_fffd, true),
            (0x0000_0000, true),
        ] {
            assert_eq!(signals_rbf(sequence), expected, "sequence {sequence:#x}");
        }

        let tx = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0).with_sequence(0xffff_fffd))
                .with_output(90_000, scripts::p2pkh(&[0x11; 20])),
        );
        let analysis = analyze(&tx, None);
        assert!(analysis.rbf);
        assert!(codes(&analysis).contains(&"RBF_SIGNALING"));
    }

    #[test]
    fn locktime_kinds_split_at_half_billion() {
        assert_eq!(classify_locktime(0), LockTimeKind::None);
        assert_eq!(classify_locktime(840_000), LockTimeKind::Height(840_000));
        assert_eq!(classify_locktime(499_999_999), LockTimeKind::Height(499_999_999));
        assert_eq!(
            classify_locktime(1_700_000_000),
            LockTimeKind::UnixTime(1_700_000_000)
        );
    }

    #[test]
    fn sequence_relative_locks_follow_bip68() {
        assert_eq!(decode_sequence(0xffff_ffff), None);
        assert_eq!(decode_sequence(0x8000_0000), None);
        assert_eq!(decode_sequence(144), Some(RelativeLock::Blocks(144)));
        assert_eq!(
            decode_sequence(SEQUENCE_TIME_BIT | 10),
            Some(RelativeLock::Time { seconds: 5120 })
        );
        // Upper sequence bits outside the mask are ignored.
        assert_eq!(
            decode_sequence(0x0001_0090),
            Some(RelativeLock::Blocks(0x90))
        );
    }

    #[test]
    fn witness_savings_only_for_segwit() {
        let legacy = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(1_000, scripts::p2pkh(&[0x11; 20])),
        );
        assert_eq!(analyze(&legacy, None).segwit_savings_pct, None);

        let segwit = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0).with_witness(vec![vec![0xaa; 72]]))
                .with_output(1_000, scripts::p2wpkh(&[0x11; 20])),
        );
        let savings = analyze(&segwit, None).segwit_savings_pct.unwrap();
        assert!(savings > 0.0 && savings < 75.0);

        let expected =
            (1.0 - segwit.sizes.weight as f64 / (segwit.sizes.total * 4) as f64) * 100.0;
        assert!((savings - expected).abs() < 0.01);
    }

    #[test]
    fn dust_warnings_use_per_type_thresholds() {
        let tx = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(545, scripts::p2pkh(&[0x11; 20]))
                .with_output(293, scripts::p2wpkh(&[0x22; 20]))
                .with_output(294, scripts::p2wpkh(&[0x33; 20]))
                .with_output(329, scripts::p2tr(&[0x44; 32]))
                .with_output(0, scripts::op_return(&[b"data"])),
        );
        let analysis = analyze(&tx, None);
        let dust: Vec<&Warning> = analysis
            .warnings
            .iter()
            .filter(|w| w.code == "DUST_OUTPUT")
            .collect();
        assert_eq!(dust.len(), 3);
        assert!(dust[0].detail.contains("output 0"));
        assert!(dust[1].detail.contains("output 1"));
        assert!(dust[2].detail.contains("output 3"));
    }

    #[test]
    fn high_fee_and_unknown_script_warnings() {
        let tx = decode(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(1_000, vec![0x51, 0x51]),
        );
        // Far above 1000 sat/vB on a tiny transaction.
        let analysis = analyze(&tx, Some(&[90_000_000]));
        let codes = codes(&analysis);
        assert!(codes.contains(&"HIGH_FEE"));
        assert!(codes.contains(&"UNKNOWN_OUTPUT_SCRIPT"));
    }
}
