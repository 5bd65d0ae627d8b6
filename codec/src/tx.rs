use crate::compact::{read_compact_size, write_compact_size, CompactSize};
use crate::cursor::ByteCursor;
use crate::hash::{sha256d, sha256d_parts};
use crate::script::classify_script_pubkey;
use chain_lens_types::{
    DecodeError, Diagnostic, Input, Output, TransactionRecord, TxSizes, Witness,
};

/// Soft caps against pathological counts; far above anything that fits in a
/// consensus-sized transaction.
const MAX_INPUTS: u64 = 1_000_000;
const MAX_OUTPUTS: u64 = 1_000_000;

/// Selects which fields the decoder materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Everything: script bytes, witness items, WTXID.
    Full,
    /// Block fast path: classification, sizes, and identifiers only;
    /// script bytes are kept solely for a coinbase input.
    Summary,
}

/// Decodes a buffer holding exactly one transaction.
pub fn decode_transaction(raw: &[u8]) -> Result<TransactionRecord, DecodeError> {
    let mut cur = ByteCursor::new(raw);
    let record = decode_transaction_at(&mut cur, DecodeMode::Full)?;
    if cur.remaining() != 0 {
        return Err(DecodeError::InvalidEncoding(format!(
            "{} trailing byte(s) after the transaction",
            cur.remaining()
        )));
    }
    Ok(record)
}

/// Decodes one transaction at the cursor, leaving the cursor just past it.
///
/// A single pass records the cursor positions bracketing the input/output
/// section so the TXID preimage is reassembled from offsets, never by
/// re-serialization.
pub fn decode_transaction_at(
    cur: &mut ByteCursor<'_>,
    mode: DecodeMode,
) -> Result<TransactionRecord, DecodeError> {
    let start = cur.position();
    let mut diagnostics = Vec::new();

    let version = cur.read_i32_le()?;

    // BIP144: a zero byte where the input count belongs is the segwit
    // marker; the flag byte must follow.
    let mut is_segwit = false;
    if cur.peek_u8() == Some(0x00) {
        let marker_offset = cur.position();
        cur.skip(1)?;
        let flag = cur.read_u8()?;
        if flag != 0x01 {
            return Err(DecodeError::InvalidMarkerFlag { offset: marker_offset });
        }
        is_segwit = true;
    }

    let start_inputs = cur.position();

    let input_count = read_checked(cur, &mut diagnostics)?;
    if input_count.value > MAX_INPUTS {
        return Err(DecodeError::ExcessiveInputs { count: input_count.value });
    }

    let mut inputs = Vec::new();
    for _ in 0..input_count.value {
        let prev_txid = cur.read_array::<32>()?;
        let prev_vout = cur.read_u32_le()?;
        let script_len = read_checked(cur, &mut diagnostics)?;
        let script_bytes = cur.read_bytes(script_len.value as usize)?;
        let sequence = cur.read_u32_le()?;

        let keep_script = mode == DecodeMode::Full
            || (prev_vout == u32::MAX && prev_txid == [0u8; 32]);
        inputs.push(Input {
            prev_txid,
            prev_vout,
            script_sig: if keep_script { script_bytes.to_vec() } else { Vec::new() },
            witness: Witness::Legacy,
            sequence,
        });
    }

    let output_count = read_checked(cur, &mut diagnostics)?;
    if output_count.value > MAX_OUTPUTS {
        return Err(DecodeError::ExcessiveOutputs { count: output_count.value });
    }

    let mut outputs = Vec::new();
    for _ in 0..output_count.value {
        let value_sats = cur.read_u64_le()?;
        let script_len = read_checked(cur, &mut diagnostics)?;
        let script_bytes = cur.read_bytes(script_len.value as usize)?;
        outputs.push(Output {
            value_sats,
            kind: classify_script_pubkey(script_bytes),
            script_pubkey: if mode == DecodeMode::Full {
                script_bytes.to_vec()
            } else {
                Vec::new()
            },
        });
    }

    let end_outputs = cur.position();

    if is_segwit {
        let mut witness_items = 0u64;
        for input in inputs.iter_mut() {
            let item_count = read_checked(cur, &mut diagnostics)?;
            witness_items += item_count.value;
            let mut items = Vec::new();
            for _ in 0..item_count.value {
                let item_len = read_checked(cur, &mut diagnostics)?;
                let bytes = cur.read_bytes(item_len.value as usize)?;
                if mode == DecodeMode::Full {
                    items.push(bytes.to_vec());
                }
            }
            input.witness = Witness::Segwit(items);
        }
        // BIP144: a transaction with nothing in its witness must use the
        // legacy serialization, so an all-empty witness section means the
        // marker was bogus.
        if witness_items == 0 {
            return Err(DecodeError::InvalidWitness(
                "segwit marker present but every witness stack is empty".to_string(),
            ));
        }
    }

    let locktime = cur.read_u32_le()?;
    let end = cur.position();

    let non_witness = 4 + (end_outputs - start_inputs) + 4;
    let sizes = TxSizes::from_parts(non_witness, (end - start) - non_witness);

    // The non-witness preimage: version, the input/output section, locktime.
    let txid = sha256d_parts(&[
        cur.slice(start, start + 4),
        cur.slice(start_inputs, end_outputs),
        cur.slice(end - 4, end),
    ]);
    let wtxid = (is_segwit && mode == DecodeMode::Full)
        .then(|| sha256d(cur.slice(start, end)));

    Ok(TransactionRecord {
        version,
        is_segwit,
        inputs,
        outputs,
        locktime,
        txid,
        wtxid,
        sizes,
        diagnostics,
    })
}

fn read_checked(
    cur: &mut ByteCursor<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CompactSize, DecodeError> {
    let cs = read_compact_size(cur)?;
    if !cs.minimal {
        diagnostics.push(Diagnostic::NonCanonicalSize { offset: cs.offset });
    }
    Ok(cs)
}

/// Re-serializes a record to wire bytes: the decoder's inverse for records
/// decoded in [`DecodeMode::Full`] from minimally encoded sources.
pub fn serialize_transaction(tx: &TransactionRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(tx.sizes.total);
    out.extend_from_slice(&tx.version.to_le_bytes());
    if tx.is_segwit {
        out.extend_from_slice(&[0x00, 0x01]);
    }
    write_compact_size(&mut out, tx.inputs.len() as u64);
    for input in &tx.inputs {
        out.extend_from_slice(&input.prev_txid);
        out.extend_from_slice(&input.prev_vout.to_le_bytes());
        write_compact_size(&mut out, input.script_sig.len() as u64);
        out.extend_from_slice(&input.script_sig);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }
    write_compact_size(&mut out, tx.outputs.len() as u64);
    for output in &tx.outputs {
        out.extend_from_slice(&output.value_sats.to_le_bytes());
        write_compact_size(&mut out, output.script_pubkey.len() as u64);
        out.extend_from_slice(&output.script_pubkey);
    }
    if tx.is_segwit {
        for input in &tx.inputs {
            let items = input.witness.items();
            write_compact_size(&mut out, items.len() as u64);
            for item in items {
                write_compact_size(&mut out, item.len() as u64);
                out.extend_from_slice(item);
            }
        }
    }
    out.extend_from_slice(&tx.locktime.to_le_bytes());
    out
}
