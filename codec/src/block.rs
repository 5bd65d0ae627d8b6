//! Bitcoin Core `blk*.dat` parsing: XOR descrambling, magic-anchored region
//! enumeration, header parsing, merkle recomputation, BIP34 height decoding.

use byteorder::{ByteOrder, LittleEndian};

use crate::compact::read_compact_size;
use crate::cursor::ByteCursor;
use crate::hash::sha256d;
use crate::tx::{decode_transaction_at, DecodeMode};
use chain_lens_types::{BlockHeader, BlockRecord, DecodeError, Network};

/// The 4-byte network magic that anchors every on-disk region.
pub fn network_magic(network: Network) -> [u8; 4] {
    match network {
        Network::Mainnet => [0xf9, 0xbe, 0xb4, 0xd9],
        Network::Testnet => [0x0b, 0x11, 0x09, 0x07],
    }
}

/// Applies the cyclic XOR key from `xor.dat` in place. An empty or all-zero
/// key leaves the buffer untouched.
pub fn descramble(buf: &mut [u8], key: &[u8]) {
    if key.is_empty() || key.iter().all(|byte| *byte == 0) {
        return;
    }
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i % key.len()];
    }
}

/// One magic-framed region of a block or undo file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRegion {
    /// Offset of the payload's first byte (past magic and size).
    pub offset: usize,
    pub size: usize,
}

/// Scans for magic-anchored regions.
///
/// The scan is byte-wise, so zero padding at the tail of a file and slack
/// between regions (such as undo checksums) are skipped over.
pub fn enumerate_regions(buf: &[u8], magic: [u8; 4]) -> Vec<FileRegion> {
    let mut regions = Vec::new();
    let mut pos = 0;
    while pos + 8 <= buf.len() {
        if buf[pos..pos + 4] != magic {
            pos += 1;
            continue;
        }
        let size = LittleEndian::read_u32(&buf[pos + 4..pos + 8]) as usize;
        let offset = pos + 8;
        if size == 0 || offset + size > buf.len() {
            // A magic match whose size runs off the file is a false anchor.
            pos += 1;
            continue;
        }
        regions.push(FileRegion { offset, size });
        pos = offset + size;
    }
    regions
}

/// Decodes one block payload. `file_offset` anchors the offsets reported for
/// the block and its transactions.
pub fn decode_block(
    payload: &[u8],
    file_offset: u64,
    mode: DecodeMode,
) -> Result<BlockRecord, DecodeError> {
    let mut cur = ByteCursor::new(payload);
    let header = decode_header(&mut cur)?;

    let tx_count = read_compact_size(&mut cur)?;
    let mut transactions = Vec::new();
    let mut tx_offsets = Vec::new();
    for _ in 0..tx_count.value {
        tx_offsets.push(file_offset + cur.position() as u64);
        transactions.push(decode_transaction_at(&mut cur, mode)?);
    }

    let txids: Vec<[u8; 32]> = transactions.iter().map(|tx| tx.txid).collect();
    let merkle_root_computed = merkle_root(&txids);

    // BIP34 heights only exist in version 2 and later blocks.
    let coinbase_height = if header.version >= 2 {
        transactions
            .first()
            .filter(|tx| tx.is_coinbase())
            .and_then(|tx| decode_bip34_height(&tx.inputs[0].script_sig))
    } else {
        None
    };

    Ok(BlockRecord {
        merkle_ok: merkle_root_computed == header.merkle_root,
        header,
        tx_count: tx_count.value,
        transactions,
        tx_offsets,
        merkle_root_computed,
        coinbase_height,
        file_offset,
        size: payload.len() as u64,
    })
}

/// Parses the fixed 80-byte header; the block hash is the double-SHA-256 of
/// those bytes.
pub fn decode_header(cur: &mut ByteCursor<'_>) -> Result<BlockHeader, DecodeError> {
    let start = cur.position();
    let version = cur.read_i32_le()?;
    let prev_block_hash = cur.read_array::<32>()?;
    let merkle_root = cur.read_array::<32>()?;
    let timestamp = cur.read_u32_le()?;
    let bits = cur.read_u32_le()?;
    let nonce = cur.read_u32_le()?;
    let block_hash = sha256d(cur.slice(start, start + 80));

    Ok(BlockHeader {
        version,
        prev_block_hash,
        merkle_root,
        timestamp,
        bits,
        nonce,
        block_hash,
    })
}

/// Level-by-level double-SHA-256 of adjacent TXID pairs; an odd level
/// duplicates its last hash.
pub fn merkle_root(txids: &[[u8; 32]]) -> [u8; 32] {
    if txids.is_empty() {
        return [0u8; 32];
    }
    let mut level = txids.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let mut preimage = [0u8; 64];
            preimage[..32].copy_from_slice(&pair[0]);
            preimage[32..].copy_from_slice(pair.get(1).unwrap_or(&pair[0]));
            next.push(sha256d(&preimage));
        }
        level = next;
    }
    level[0]
}

/// BIP34: the coinbase scriptSig opens with a minimal push of the height.
pub fn decode_bip34_height(script_sig: &[u8]) -> Option<u32> {
    let len = *script_sig.first()? as usize;
    if len == 0 || len > 5 || script_sig.len() < 1 + len {
        return None;
    }
    let bytes = &script_sig[1..1 + len];

    // Minimal CScriptNum: positive, no redundant leading zero byte.
    let last = bytes[len - 1];
    if last & 0x80 != 0 {
        return None;
    }
    if last == 0 && (len == 1 || bytes[len - 2] & 0x80 == 0) {
        return None;
    }

    let mut height: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        height |= (*byte as u64) << (8 * i);
    }
    u32::try_from(height).ok()
}
