//! Joins the decoders' outputs into reports: prevout data into transaction
//! analyses, undo payloads into per-block fee accounting.

use crate::policy;
use crate::report::{
    BlockReport, FeesReport, HeaderReport, InputReport, OpReturnReport, OutputReport,
    PrevoutReport, RelativeTimelockReport, SizesReport, TxReport, TxSummaryReport,
};
use chain_lens_codec::{address, opcodes, script};
use chain_lens_types::{
    BlockRecord, DecodeError, Network, RelativeLock, TransactionRecord, UndoBlock,
};
use log::warn;

/// A known prevout for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prevout {
    pub value_sats: u64,
    pub script_pubkey: Vec<u8>,
}

/// Builds the transaction-mode report. `prevouts`, when present, must hold
/// one entry per input in input order.
pub fn transaction_report(
    tx: &TransactionRecord,
    prevouts: Option<&[Prevout]>,
    network: Network,
) -> Result<TxReport, DecodeError> {
    if let Some(prevouts) = prevouts {
        if prevouts.len() != tx.inputs.len() {
            return Err(DecodeError::InvalidEncoding(format!(
                "{} prevout(s) supplied for {} input(s)",
                prevouts.len(),
                tx.inputs.len()
            )));
        }
    }

    let values: Option<Vec<u64>> = prevouts.map(|list| list.iter().map(|p| p.value_sats).collect());
    let analysis = policy::analyze(tx, values.as_deref());

    let inputs = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let prevout = prevouts.map(|list| &list[index]);
            let classified_kind = match prevout {
                Some(p) => script::classify_input(
                    &p.script_pubkey,
                    &input.script_sig,
                    input.witness.items(),
                ),
                None => chain_lens_types::ClassifiedKind::Unknown,
            };
            InputReport {
                prev_txid: input.prev_txid_hex(),
                prev_vout: input.prev_vout,
                sequence: input.sequence,
                classified_kind,
                script_sig_asm: opcodes::disassemble(&input.script_sig),
                witness: input.witness.items().iter().map(hex::encode).collect(),
                rbf_signals: policy::signals_rbf(input.sequence),
                relative_timelock: analysis.relative_locks[index].map(relative_timelock),
                prevout: prevout.map(|p| {
                    let kind = script::classify_script_pubkey(&p.script_pubkey);
                    PrevoutReport {
                        value: p.value_sats,
                        kind,
                        address: address::derive_address(&p.script_pubkey, kind, network),
                    }
                }),
            }
        })
        .collect();

    let outputs = tx
        .outputs
        .iter()
        .enumerate()
        .map(|(index, output)| OutputReport {
            index,
            value_sats: output.value_sats,
            classified_kind: output.kind,
            address: address::derive_address(&output.script_pubkey, output.kind, network),
            script_pubkey_hex: hex::encode(&output.script_pubkey),
            script_pubkey_asm: opcodes::disassemble(&output.script_pubkey),
            op_return: script::decode_op_return(&output.script_pubkey).map(|decoded| {
                OpReturnReport {
                    data_hex: hex::encode(&decoded.data),
                    data_utf8: decoded.utf8,
                    protocol: decoded.protocol.as_str(),
                }
            }),
        })
        .collect();

    Ok(TxReport {
        txid: tx.txid_hex(),
        wtxid: tx.wtxid_hex(),
        version: tx.version,
        is_segwit: tx.is_segwit,
        locktime: tx.locktime,
        sizes: SizesReport {
            total_size: tx.sizes.total,
            non_witness_size: tx.sizes.non_witness,
            witness_size: tx.sizes.witness,
            weight: tx.sizes.weight,
            vbytes: tx.sizes.vbytes,
        },
        inputs,
        outputs,
        fees: FeesReport {
            absolute_sats: analysis.fee_sats,
            rate_sat_per_vb: analysis.fee_rate_sat_vb,
            segwit_savings_pct: analysis.segwit_savings_pct,
        },
        locktime_kind: analysis.locktime_kind.label(),
        warnings: analysis.warnings,
    })
}

fn relative_timelock(lock: RelativeLock) -> RelativeTimelockReport {
    match lock {
        RelativeLock::Blocks(blocks) => RelativeTimelockReport {
            kind: "blocks",
            value: blocks as u64,
        },
        RelativeLock::Time { seconds } => RelativeTimelockReport {
            kind: "time",
            value: seconds as u64,
        },
    }
}

/// Pairs undo payloads to blocks by ordered non-coinbase transaction count:
/// each payload, in file order, takes the next block whose non-coinbase
/// count equals the payload's entry count.
///
/// Returns, per block, the index of its undo payload. Blocks passed over
/// during matching stay unpaired and are logged, since an interleaved
/// `rev*.dat` makes this heuristic ambiguous.
pub fn pair_undo_blocks(
    blocks: &[BlockRecord],
    undos: &[UndoBlock],
) -> Result<Vec<Option<usize>>, DecodeError> {
    let mut pairing = vec![None; blocks.len()];
    let mut next_block = 0;

    for (undo_index, undo) in undos.iter().enumerate() {
        let mut paired = false;
        while next_block < blocks.len() {
            let block = &blocks[next_block];
            let candidate = block.non_coinbase_count();
            if candidate == undo.txs.len() {
                pairing[next_block] = Some(undo_index);
                next_block += 1;
                paired = true;
                break;
            }
            warn!(
                "block at offset {} ({} non-coinbase txs) skipped while pairing undo data",
                block.file_offset, candidate
            );
            next_block += 1;
        }
        if !paired {
            return Err(DecodeError::UndoMismatch {
                block_side: blocks.len() - next_block,
                undo_side: undo.txs.len(),
            });
        }
    }

    Ok(pairing)
}

/// Assembles per-block reports, joining paired undo amounts into fees.
pub fn block_reports(
    file: &str,
    blocks: &[BlockRecord],
    undos: &[UndoBlock],
) -> Result<Vec<BlockReport>, DecodeError> {
    let pairing = pair_undo_blocks(blocks, undos)?;
    blocks
        .iter()
        .zip(pairing)
        .map(|(block, undo_index)| block_report(file, block, undo_index.map(|i| &undos[i])))
        .collect()
}

fn block_report(
    file: &str,
    block: &BlockRecord,
    undo: Option<&UndoBlock>,
) -> Result<BlockReport, DecodeError> {
    let mut tx_summary = Vec::with_capacity(block.transactions.len());
    let mut undo_entry = 0;

    for (index, tx) in block.transactions.iter().enumerate() {
        let fee_sats = if tx.is_coinbase() {
            None
        } else if let Some(undo) = undo {
            let prevouts = &undo.txs[undo_entry];
            undo_entry += 1;
            if prevouts.len() != tx.inputs.len() {
                return Err(DecodeError::UndoMismatch {
                    block_side: tx.inputs.len(),
                    undo_side: prevouts.len(),
                });
            }
            let inflow: u64 = prevouts.iter().map(|p| p.amount_sats).sum();
            inflow.checked_sub(tx.total_output_value())
        } else {
            None
        };

        let mut kinds = Vec::new();
        for output in &tx.outputs {
            if !kinds.contains(&output.kind) {
                kinds.push(output.kind);
            }
        }

        tx_summary.push(TxSummaryReport {
            index,
            txid: tx.txid_hex(),
            total_out_sats: tx.total_output_value(),
            fee_sats,
            weight: tx.sizes.weight,
            kinds,
        });
    }

    Ok(BlockReport {
        file: file.to_string(),
        offset: block.file_offset,
        size: block.size,
        header: HeaderReport {
            version: block.header.version,
            block_hash: block.header.block_hash_hex(),
            prev_block_hash: block.header.prev_block_hash_hex(),
            merkle_root: block.header.merkle_root_hex(),
            timestamp: block.header.timestamp,
            bits: block.header.bits,
            nonce: block.header.nonce,
        },
        tx_count: block.tx_count,
        coinbase_height: block.coinbase_height,
        merkle_ok: block.merkle_ok,
        merkle_root_computed: chain_lens_types::display_hash(&block.merkle_root_computed),
        tx_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chain_lens_codec::block::decode_block;
    use chain_lens_codec::{decode_transaction, DecodeMode};
    use chain_lens_test_utils::{scripts, BlockBuilder, TestInput, TransactionBuilder};
    use chain_lens_types::{ClassifiedKind, RecoveredPrevout, UndoBlock};

    fn prevout(value_sats: u64, script_pubkey: Vec<u8>) -> Prevout {
        Prevout { value_sats, script_pubkey }
    }

    fn recovered(amount_sats: u64, script_pubkey: Vec<u8>) -> RecoveredPrevout {
        RecoveredPrevout {
            height: 100,
            is_coinbase: false,
            amount_sats,
            kind: chain_lens_codec::script::classify_script_pubkey(&script_pubkey),
            script_pubkey,
        }
    }

    #[test]
    fn transaction_report_joins_prevouts() {
        let tx = decode_transaction(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 2).with_witness(vec![vec![0xaa; 64]]))
                .with_output(70_000, scripts::p2wpkh(&[0x11; 20]))
                .with_output(20_000, scripts::op_return(&[b"hello"]))
                .build(),
        )
        .unwrap();

        let prevouts = [prevout(100_000, scripts::p2tr(&[0x22; 32]))];
        let report = transaction_report(&tx, Some(&prevouts), Network::Mainnet).unwrap();

        assert_eq!(report.fees.absolute_sats, Some(10_000));
        assert_eq!(report.inputs[0].classified_kind, ClassifiedKind::P2trKeypath);
        let joined = report.inputs[0].prevout.as_ref().unwrap();
        assert_eq!(joined.value, 100_000);
        assert_eq!(joined.kind, ClassifiedKind::P2tr);
        assert!(joined.address.as_ref().unwrap().starts_with("bc1p"));

        assert_eq!(report.outputs[0].classified_kind, ClassifiedKind::P2wpkh);
        assert!(report.outputs[0].address.as_ref().unwrap().starts_with("bc1q"));
        let op_return = report.outputs[1].op_return.as_ref().unwrap();
        assert_eq!(op_return.data_utf8.as_deref(), Some("hello"));
        assert_eq!(op_return.protocol, "unknown");
        assert!(report.outputs[1].address.is_none());
    }

    #[test]
    fn transaction_report_without_prevouts_leaves_fees_null() {
        let tx = decode_transaction(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(1_000, scripts::p2pkh(&[0x11; 20]))
                .build(),
        )
        .unwrap();

        let report = transaction_report(&tx, None, Network::Mainnet).unwrap();
        assert_eq!(report.fees.absolute_sats, None);
        assert_eq!(report.inputs[0].classified_kind, ClassifiedKind::Unknown);
        assert!(report.inputs[0].prevout.is_none());
        assert_eq!(report.wtxid, None);
        assert_eq!(report.locktime_kind, "none");
    }

    #[test]
    fn transaction_report_rejects_misaligned_prevouts() {
        let tx = decode_transaction(
            &TransactionBuilder::new()
                .with_input(TestInput::spend([0x01; 32], 0))
                .with_output(1_000, scripts::p2pkh(&[0x11; 20]))
                .build(),
        )
        .unwrap();

        let prevouts = [
            prevout(1, scripts::p2pkh(&[0x22; 20])),
            prevout(2, scripts::p2pkh(&[0x33; 20])),
        ];
        assert_matches!(
            transaction_report(&tx, Some(&prevouts), Network::Mainnet),
            Err(DecodeError::InvalidEncoding(_))
        );
    }

    fn block_with_spends(coinbase_height_push: Vec<u8>, spends: usize) -> BlockRecord {
        let mut builder = BlockBuilder::new().with_transaction(
            TransactionBuilder::new()
                .with_coinbase_input(coinbase_height_push)
                .with_output(50_0000_0000, scripts::p2pkh(&[0xaa; 20])),
        );
        for i in 0..spends {
            builder = builder.with_transaction(
                TransactionBuilder::new()
                    .with_input(TestInput::spend([i as u8 + 1; 32], 0))
                    .with_output(40_000, scripts::p2wpkh(&[i as u8; 20])),
            );
        }
        decode_block(&builder.build(), 8, DecodeMode::Summary).unwrap()
    }

    #[test]
    fn pairing_matches_by_non_coinbase_count() {
        let blocks = [
            block_with_spends(vec![0x03, 0x40, 0xd1, 0x0c], 2),
            block_with_spends(vec![0x03, 0x41, 0xd1, 0x0c], 1),
        ];
        let undos = [
            UndoBlock {
                txs: vec![
                    vec![recovered(50_000, scripts::p2pkh(&[0x01; 20]))],
                    vec![recovered(45_000, scripts::p2pkh(&[0x02; 20]))],
                ],
                file_offset: 8,
            },
            UndoBlock {
                txs: vec![vec![recovered(41_000, scripts::p2pkh(&[0x03; 20]))]],
                file_offset: 90,
            },
        ];

        let pairing = pair_undo_blocks(&blocks, &undos).unwrap();
        assert_eq!(pairing, vec![Some(0), Some(1)]);
    }

    #[test]
    fn pairing_failure_is_undo_mismatch() {
        let blocks = [block_with_spends(vec![0x03, 0x40, 0xd1, 0x0c], 1)];
        let undos = [UndoBlock {
            txs: vec![
                vec![recovered(1_000, scripts::p2pkh(&[0x01; 20]))],
                vec![recovered(2_000, scripts::p2pkh(&[0x02; 20]))],
            ],
            file_offset: 8,
        }];

        assert_matches!(
            pair_undo_blocks(&blocks, &undos),
            Err(DecodeError::UndoMismatch { .. })
        );
    }

    #[test]
    fn block_reports_compute_fees_from_undo_amounts() {
        let blocks = [block_with_spends(vec![0x03, 0x40, 0xd1, 0x0c], 1)];
        let undos = [UndoBlock {
            txs: vec![vec![recovered(41_500, scripts::p2pkh(&[0x01; 20]))]],
            file_offset: 8,
        }];

        let reports = block_reports("blk00000.dat", &blocks, &undos).unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.file, "blk00000.dat");
        assert!(report.merkle_ok);
        assert_eq!(report.coinbase_height, Some(840_000));
        assert_eq!(report.tx_summary[0].fee_sats, None); // coinbase
        assert_eq!(report.tx_summary[1].fee_sats, Some(1_500));
        assert_eq!(report.tx_summary[1].kinds, vec![ClassifiedKind::P2wpkh]);
    }

    #[test]
    fn input_count_divergence_is_undo_mismatch() {
        let blocks = [block_with_spends(vec![0x03, 0x40, 0xd1, 0x0c], 1)];
        // One transaction entry (count matches) holding two prevouts for a
        // single-input transaction.
        let undos = [UndoBlock {
            txs: vec![vec![
                recovered(1_000, scripts::p2pkh(&[0x01; 20])),
                recovered(2_000, scripts::p2pkh(&[0x02; 20])),
            ]],
            file_offset: 8,
        }];

        assert_matches!(
            block_reports("blk00000.dat", &blocks, &undos),
            Err(DecodeError::UndoMismatch { block_side: 1, undo_side: 2 })
        );
    }

    #[test]
    fn blocks_without_undo_report_null_fees() {
        let blocks = [block_with_spends(vec![0x03, 0x40, 0xd1, 0x0c], 1)];
        let reports = block_reports("blk00000.dat", &blocks, &[]).unwrap();
        assert_eq!(reports[0].tx_summary[1].fee_sats, None);
    }
}
