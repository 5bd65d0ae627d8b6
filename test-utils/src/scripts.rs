//! Canonical scriptPubKey templates assembled by hand for fixtures.

pub fn p2pkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

pub fn p2sh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![0xa9, 0x14];
    script.extend_from_slice(hash);
    script.push(0x87);
    script
}

pub fn p2wpkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![0x00, 0x14];
    script.extend_from_slice(hash);
    script
}

pub fn p2wsh(hash: &[u8; 32]) -> Vec<u8> {
    let mut script = vec![0x00, 0x20];
    script.extend_from_slice(hash);
    script
}

pub fn p2tr(program: &[u8; 32]) -> Vec<u8> {
    let mut script = vec![0x51, 0x20];
    script.extend_from_slice(program);
    script
}

/// `<pubkey push> OP_CHECKSIG`; accepts 33- or 65-byte keys.
pub fn p2pk(pubkey: &[u8]) -> Vec<u8> {
    let mut script = vec![pubkey.len() as u8];
    script.extend_from_slice(pubkey);
    script.push(0xac);
    script
}

/// `OP_m <pushes> OP_n OP_CHECKMULTISIG` over the given keys; `m` is taken
/// as-is so malformed templates can be produced on purpose.
pub fn multisig(m: u8, pubkeys: &[&[u8]]) -> Vec<u8> {
    let mut script = vec![0x50 + m];
    for pubkey in pubkeys {
        script.push(pubkey.len() as u8);
        script.extend_from_slice(pubkey);
    }
    script.push(0x50 + pubkeys.len() as u8);
    script.push(0xae);
    script
}

/// `OP_RETURN` followed by one direct push per payload.
pub fn op_return(payloads: &[&[u8]]) -> Vec<u8> {
    let mut script = vec![0x6a];
    for payload in payloads {
        script.push(payload.len() as u8);
        script.extend_from_slice(payload);
    }
    script
}
