//! Byte-level fixture builders shared by the member crates' tests.
//!
//! Everything here serializes independently of the production decoders so
//! tests compare against bytes assembled by a second pair of hands.

use sha2::{Digest, Sha256};

pub mod scripts;

/// Double SHA-256, computed locally so fixtures do not lean on the code
/// under test.
pub fn dsha256(data: &[u8]) -> [u8; 32] {
    let first: [u8; 32] = Sha256::digest(data).into();
    Sha256::digest(first).into()
}

/// Appends the minimal CompactSize encoding of `value`.
pub fn write_compact(out: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// One input under construction.
#[derive(Debug, Clone)]
pub struct TestInput {
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TestInput {
    pub fn spend(prev_txid: [u8; 32], prev_vout: u32) -> Self {
        TestInput {
            prev_txid,
            prev_vout,
            script_sig: Vec::new(),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        }
    }

    pub fn with_script_sig(mut self, script_sig: Vec<u8>) -> Self {
        self.script_sig = script_sig;
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_witness(mut self, witness: Vec<Vec<u8>>) -> Self {
        self.witness = witness;
        self
    }
}

/// Wire-format transaction builder. The built bytes use segwit serialization
/// exactly when some input carries witness items.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    version: i32,
    locktime: u32,
    inputs: Vec<TestInput>,
    outputs: Vec<(u64, Vec<u8>)>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        TransactionBuilder {
            version: 2,
            locktime: 0,
            inputs: vec![],
            outputs: vec![],
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_locktime(mut self, locktime: u32) -> Self {
        self.locktime = locktime;
        self
    }

    pub fn with_input(mut self, input: TestInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Adds the all-zero/0xFFFFFFFF outpoint input that marks a coinbase.
    pub fn with_coinbase_input(mut self, script_sig: Vec<u8>) -> Self {
        self.inputs.push(TestInput {
            prev_txid: [0u8; 32],
            prev_vout: u32::MAX,
            script_sig,
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        });
        self
    }

    pub fn with_output(mut self, value_sats: u64, script_pubkey: Vec<u8>) -> Self {
        self.outputs.push((value_sats, script_pubkey));
        self
    }

    fn is_segwit(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Serializes to wire bytes.
    pub fn build(&self) -> Vec<u8> {
        let segwit = self.is_segwit();
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        if segwit {
            out.extend_from_slice(&[0x00, 0x01]);
        }
        self.write_core(&mut out);
        if segwit {
            for input in &self.inputs {
                write_compact(&mut out, input.witness.len() as u64);
                for item in &input.witness {
                    write_compact(&mut out, item.len() as u64);
                    out.extend_from_slice(item);
                }
            }
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Serializes without marker, flag, or witness data (the TXID preimage).
    pub fn build_non_witness(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        self.write_core(&mut out);
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// The TXID in wire order.
    pub fn txid(&self) -> [u8; 32] {
        dsha256(&self.build_non_witness())
    }

    fn write_core(&self, out: &mut Vec<u8>) {
        write_compact(out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_txid);
            out.extend_from_slice(&input.prev_vout.to_le_bytes());
            write_compact(out, input.script_sig.len() as u64);
            out.extend_from_slice(&input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_compact(out, self.outputs.len() as u64);
        for (value, script_pubkey) in &self.outputs {
            out.extend_from_slice(&value.to_le_bytes());
            write_compact(out, script_pubkey.len() as u64);
            out.extend_from_slice(script_pubkey);
        }
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized-block builder; the header's merkle root is recomputed from the
/// added transactions.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    version: i32,
    prev_block_hash: [u8; 32],
    timestamp: u32,
    bits: u32,
    nonce: u32,
    transactions: Vec<TransactionBuilder>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        BlockBuilder {
            version: 2,
            prev_block_hash: [0u8; 32],
            timestamp: 1_700_000_000,
            bits: 0x1d00_ffff,
            nonce: 0,
            transactions: vec![],
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_prev_block_hash(mut self, prev_block_hash: [u8; 32]) -> Self {
        self.prev_block_hash = prev_block_hash;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_transaction(mut self, transaction: TransactionBuilder) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Merkle root over the added transactions' TXIDs, duplicating the last
    /// hash of every odd level.
    pub fn merkle_root(&self) -> [u8; 32] {
        let mut level: Vec<[u8; 32]> = self.transactions.iter().map(|tx| tx.txid()).collect();
        assert!(!level.is_empty(), "a block needs at least a coinbase");
        while level.len() > 1 {
            let mut next = Vec::new();
            for pair in level.chunks(2) {
                let mut preimage = Vec::with_capacity(64);
                preimage.extend_from_slice(&pair[0]);
                preimage.extend_from_slice(pair.get(1).unwrap_or(&pair[0]));
                next.push(dsha256(&preimage));
            }
            level = next;
        }
        level[0]
    }

    /// The 80 header bytes.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(80);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block_hash);
        out.extend_from_slice(&self.merkle_root());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.bits.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Header, transaction count, and transactions: one block payload.
    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        write_compact(&mut out, self.transactions.len() as u64);
        for tx in &self.transactions {
            out.extend_from_slice(&tx.build());
        }
        out
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames payloads the way Bitcoin Core lays out `blk*.dat`/`rev*.dat`
/// regions, then applies the cyclic XOR key (empty key leaves plaintext).
pub fn frame_file(payloads: &[Vec<u8>], magic: [u8; 4], xor_key: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for payload in payloads {
        out.extend_from_slice(&magic);
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
    }
    if !xor_key.is_empty() {
        for (i, byte) in out.iter_mut().enumerate() {
            *byte ^= xor_key[i % xor_key.len()];
        }
    }
    out
}
