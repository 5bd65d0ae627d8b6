//! Bitcoin Core `rev*.dat` parsing: per-block undo payloads recovering the
//! prevout each input spent.

use crate::compact::read_compact_size;
use crate::compress::{decompress_amount, read_core_varint};
use crate::cursor::ByteCursor;
use crate::script::classify_script_pubkey;
use crate::secp::lift_x;
use chain_lens_types::{DecodeError, RecoveredPrevout, UndoBlock};

/// Decodes one undo payload: one entry per non-coinbase transaction, one
/// inner entry per input, in block order.
pub fn decode_undo_block(payload: &[u8], file_offset: u64) -> Result<UndoBlock, DecodeError> {
    let mut cur = ByteCursor::new(payload);
    let tx_count = read_compact_size(&mut cur)?;

    let mut txs = Vec::new();
    for _ in 0..tx_count.value {
        let input_count = read_compact_size(&mut cur)?;
        let mut prevouts = Vec::new();
        for _ in 0..input_count.value {
            prevouts.push(decode_prevout(&mut cur)?);
        }
        txs.push(prevouts);
    }

    Ok(UndoBlock { txs, file_offset })
}

fn decode_prevout(cur: &mut ByteCursor<'_>) -> Result<RecoveredPrevout, DecodeError> {
    // First varint packs the creating block's height with the coinbase flag
    // in its low bit.
    let code = read_core_varint(cur)?;
    let height = (code >> 1) as u32;
    let is_coinbase = code & 1 == 1;

    let amount_sats = decompress_amount(read_core_varint(cur)?)?;
    let script_pubkey = decompress_script(cur)?;

    Ok(RecoveredPrevout {
        height,
        is_coinbase,
        amount_sats,
        kind: classify_script_pubkey(&script_pubkey),
        script_pubkey,
    })
}

/// Rebuilds a scriptPubKey from its compressed on-disk form.
///
/// nsize -          compressed form          - script
///   0   -          hash160 of a PK          - P2PKH
///   1   -          hash160 of a script      - P2SH
///  2, 3 -      x of a compressed PK         - P2PK, 02/03 prefix
///  4, 5 -     x of an uncompressed PK       - P2PK, y recovered on the curve
///   6+  -    literal script of nsize - 6    - as stored
fn decompress_script(cur: &mut ByteCursor<'_>) -> Result<Vec<u8>, DecodeError> {
    let nsize = read_core_varint(cur)?;
    match nsize {
        0 => {
            let hash = cur.read_bytes(20)?;
            let mut script = Vec::with_capacity(25);
            script.extend_from_slice(&[0x76, 0xa9, 0x14]);
            script.extend_from_slice(hash);
            script.extend_from_slice(&[0x88, 0xac]);
            Ok(script)
        }
        1 => {
            let hash = cur.read_bytes(20)?;
            let mut script = Vec::with_capacity(23);
            script.extend_from_slice(&[0xa9, 0x14]);
            script.extend_from_slice(hash);
            script.push(0x87);
            Ok(script)
        }
        2 | 3 => {
            // nsize doubles as the stored pubkey's parity prefix.
            let x = cur.read_bytes(32)?;
            let mut script = Vec::with_capacity(35);
            script.push(0x21);
            script.push(nsize as u8);
            script.extend_from_slice(x);
            script.push(0xac);
            Ok(script)
        }
        4 | 5 => {
            let x = cur.read_array::<32>()?;
            let y = lift_x(&x, nsize == 5)?;
            let mut script = Vec::with_capacity(67);
            script.extend_from_slice(&[0x41, 0x04]);
            script.extend_from_slice(&x);
            script.extend_from_slice(&y);
            script.push(0xac);
            Ok(script)
        }
        _ => Ok(cur.read_bytes((nsize - 6) as usize)?.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chain_lens_types::ClassifiedKind;
    use hex_lit::hex;

    /// Appends the Core-internal varint encoding (the tests' own encoder,
    /// so decode paths are exercised against independently built bytes).
    fn push_varint(out: &mut Vec<u8>, mut value: u64) {
        let mut bytes = vec![(value & 0x7f) as u8];
        while value > 0x7f {
            value = (value >> 7) - 1;
            bytes.push((value & 0x7f) as u8 | 0x80);
        }
        bytes.reverse();
        out.extend_from_slice(&bytes);
    }

    /// `compress_amount` inverse of the production decoder, for fixtures.
    fn compress_amount(mut amount: u64) -> u64 {
        if amount == 0 {
            return 0;
        }
        let mut e = 0u64;
        while amount % 10 == 0 && e < 9 {
            amount /= 10;
            e += 1;
        }
        if e < 9 {
            let d = amount % 10;
            amount /= 10;
            1 + (amount * 9 + d - 1) * 10 + e
        } else {
            1 + (amount - 1) * 10 + 9
        }
    }

    fn push_prevout(out: &mut Vec<u8>, height: u32, coinbase: bool, amount: u64, nsize: u64, body: &[u8]) {
        push_varint(out, (height as u64) << 1 | coinbase as u64);
        push_varint(out, compress_amount(amount));
        push_varint(out, nsize);
        out.extend_from_slice(body);
    }

    #[test]
    fn varint_fixture_encoder_matches_decoder() {
        for value in [0u64, 1, 127, 128, 129, 256, 16511, 16512, 49918, 3_000_000_000] {
            let mut bytes = Vec::new();
            push_varint(&mut bytes, value);
            let decoded = read_core_varint(&mut ByteCursor::new(&bytes)).unwrap();
            assert_eq!(decoded, value, "value {value}");
        }
    }

    #[test]
    fn amount_fixture_encoder_matches_decoder() {
        for amount in [0u64, 1, 2, 546, 10_000, 50 * 100_000_000, 123_456_789, 21_000_000 * 100_000_000] {
            assert_eq!(decompress_amount(compress_amount(amount)).unwrap(), amount);
        }
    }

    #[test]
    fn decodes_p2pkh_and_p2sh_prevouts() {
        let hash = [0x42u8; 20];
        let mut payload = Vec::new();
        push_varint(&mut payload, 2); // two transactions
        push_varint(&mut payload, 1);
        push_prevout(&mut payload, 120_891, true, 234_925_952, 0, &hash);
        push_varint(&mut payload, 1);
        push_prevout(&mut payload, 203_998, false, 110_397, 1, &hash);

        let undo = decode_undo_block(&payload, 8).unwrap();
        assert_eq!(undo.txs.len(), 2);
        assert_eq!(undo.file_offset, 8);

        let first = &undo.txs[0][0];
        assert_eq!(first.height, 120_891);
        assert!(first.is_coinbase);
        assert_eq!(first.amount_sats, 234_925_952);
        assert_eq!(first.kind, ClassifiedKind::P2pkh);
        assert_eq!(first.script_pubkey[..3], [0x76, 0xa9, 0x14]);
        assert_eq!(first.script_pubkey[3..23], hash);

        let second = &undo.txs[1][0];
        assert!(!second.is_coinbase);
        assert_eq!(second.kind, ClassifiedKind::P2sh);
        assert_eq!(second.script_pubkey.len(), 23);
    }

    #[test]
    fn decodes_compressed_pubkey_prevout() {
        let x = hex!("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
        let mut payload = Vec::new();
        push_varint(&mut payload, 1);
        push_varint(&mut payload, 1);
        push_prevout(&mut payload, 1, false, 50 * 100_000_000, 2, &x);

        let undo = decode_undo_block(&payload, 0).unwrap();
        let prevout = &undo.txs[0][0];
        assert_eq!(prevout.kind, ClassifiedKind::P2pk);
        assert_eq!(prevout.script_pubkey.len(), 35);
        assert_eq!(prevout.script_pubkey[0], 0x21);
        assert_eq!(prevout.script_pubkey[1], 0x02);
        assert_eq!(prevout.script_pubkey[34], 0xac);
    }

    #[test]
    fn lifts_uncompressed_pubkey_prevouts() {
        let x = hex!("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
        let y_even = hex!("483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8");

        for (nsize, expect_even) in [(4u64, true), (5u64, false)] {
            let mut payload = Vec::new();
            push_varint(&mut payload, 1);
            push_varint(&mut payload, 1);
            push_prevout(&mut payload, 170, false, 10 * 100_000_000, nsize, &x);

            let undo = decode_undo_block(&payload, 0).unwrap();
            let script = &undo.txs[0][0].script_pubkey;
            assert_eq!(undo.txs[0][0].kind, ClassifiedKind::P2pk);
            assert_eq!(script.len(), 67);
            assert_eq!(script[0], 0x41);
            assert_eq!(script[1], 0x04);
            assert_eq!(&script[2..34], &x);
            if expect_even {
                assert_eq!(&script[34..66], &y_even);
            } else {
                assert_ne!(&script[34..66], &y_even);
            }
            assert_eq!(script[66], 0xac);
        }
    }

    #[test]
    fn invalid_x_coordinate_is_rejected() {
        // x = 5 has no square root for x³ + 7.
        let mut x = [0u8; 32];
        x[31] = 5;
        let mut payload = Vec::new();
        push_varint(&mut payload, 1);
        push_varint(&mut payload, 1);
        push_prevout(&mut payload, 1, false, 1000, 4, &x);

        assert_matches!(
            decode_undo_block(&payload, 0),
            Err(DecodeError::CurvePointInvalid)
        );
    }

    #[test]
    fn literal_scripts_pass_through() {
        let script = [0x6a, 0x04, 0xde, 0xad, 0xbe, 0xef];
        let mut payload = Vec::new();
        push_varint(&mut payload, 1);
        push_varint(&mut payload, 1);
        push_prevout(&mut payload, 9, false, 0, 6 + script.len() as u64, &script);

        let undo = decode_undo_block(&payload, 0).unwrap();
        let prevout = &undo.txs[0][0];
        assert_eq!(prevout.amount_sats, 0);
        assert_eq!(prevout.script_pubkey, script);
        assert_eq!(prevout.kind, ClassifiedKind::OpReturn);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut payload = Vec::new();
        push_varint(&mut payload, 1);
        push_varint(&mut payload, 1);
        push_varint(&mut payload, 20); // height code
        // Amount and script missing.
        assert_matches!(
            decode_undo_block(&payload, 0),
            Err(DecodeError::Truncated { .. })
        );
    }
}
