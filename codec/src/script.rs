use chain_lens_types::ClassifiedKind;

/// Classifies a scriptPubKey by literal match over the canonical templates.
pub fn classify_script_pubkey(script: &[u8]) -> ClassifiedKind {
    if script.len() == 25
        && script[0] == 0x76 // OP_DUP
        && script[1] == 0xa9 // OP_HASH160
        && script[2] == 0x14
        && script[23] == 0x88 // OP_EQUALVERIFY
        && script[24] == 0xac
    {
        return ClassifiedKind::P2pkh;
    }
    if script.len() == 23 && script[0] == 0xa9 && script[1] == 0x14 && script[22] == 0x87 {
        return ClassifiedKind::P2sh;
    }
    if script.len() == 22 && script[0] == 0x00 && script[1] == 0x14 {
        return ClassifiedKind::P2wpkh;
    }
    if script.len() == 34 && script[0] == 0x00 && script[1] == 0x20 {
        return ClassifiedKind::P2wsh;
    }
    if script.len() == 34 && script[0] == 0x51 && script[1] == 0x20 {
        return ClassifiedKind::P2tr;
    }
    if (script.len() == 35 && script[0] == 33 || script.len() == 67 && script[0] == 65)
        && script[script.len() - 1] == 0xac
    {
        return ClassifiedKind::P2pk;
    }
    if script.first() == Some(&0x6a) {
        return ClassifiedKind::OpReturn;
    }
    if is_bare_multisig(script) {
        return ClassifiedKind::Multisig;
    }
    ClassifiedKind::Unknown
}

/// `OP_m <m..n pubkey pushes> OP_n OP_CHECKMULTISIG` with 33/65-byte keys.
fn is_bare_multisig(script: &[u8]) -> bool {
    if script.len() < 4 {
        return false;
    }
    let m = script[0];
    let n = script[script.len() - 2];
    if !(0x51..=0x60).contains(&m) || !(0x51..=0x60).contains(&n) || m > n {
        return false;
    }
    if script[script.len() - 1] != 0xae {
        return false;
    }

    let mut keys = 0u8;
    let mut pos = 1;
    while pos < script.len() - 2 {
        let push = script[pos] as usize;
        if push != 33 && push != 65 {
            return false;
        }
        pos += 1 + push;
        keys += 1;
    }
    pos == script.len() - 2 && keys == n - 0x50
}

/// Refines an input's classification given the spent prevout's scriptPubKey
/// and the input's witness.
pub fn classify_input(
    prevout_script: &[u8],
    script_sig: &[u8],
    witness: &[Vec<u8>],
) -> ClassifiedKind {
    match classify_script_pubkey(prevout_script) {
        ClassifiedKind::P2sh if !witness.is_empty() => match last_push(script_sig) {
            Some(redeem) if redeem.len() == 22 && redeem[0] == 0x00 && redeem[1] == 0x14 => {
                ClassifiedKind::P2shP2wpkh
            }
            Some(redeem) if redeem.len() == 34 && redeem[0] == 0x00 && redeem[1] == 0x20 => {
                ClassifiedKind::P2shP2wsh
            }
            _ => ClassifiedKind::P2sh,
        },
        ClassifiedKind::P2tr => {
            if witness.len() == 1 {
                ClassifiedKind::P2trKeypath
            } else if witness.last().is_some_and(is_taproot_control_block) {
                ClassifiedKind::P2trScriptpath
            } else {
                ClassifiedKind::P2tr
            }
        }
        other => other,
    }
}

fn is_taproot_control_block(item: &Vec<u8>) -> bool {
    item.len() >= 33
        && item.len() % 32 == 1
        && (item[0] == 0xc0 || item[0] == 0xc1)
}

/// The payload of the final data push in a script, if the script is composed
/// entirely of pushes (the shape of every standard P2SH scriptSig).
fn last_push(script: &[u8]) -> Option<&[u8]> {
    let mut rest = script;
    let mut last = None;
    while !rest.is_empty() {
        let (payload, consumed) = read_push(rest)?;
        last = Some(payload);
        rest = &rest[consumed..];
    }
    last
}

/// Reads one push (direct or PUSHDATA1/2/4) from the front of `script`.
fn read_push(script: &[u8]) -> Option<(&[u8], usize)> {
    let opcode = *script.first()?;
    let (len, header) = match opcode {
        0x01..=0x4b => (opcode as usize, 1),
        0x4c => (*script.get(1)? as usize, 2),
        0x4d => {
            let bytes = script.get(1..3)?;
            (u16::from_le_bytes([bytes[0], bytes[1]]) as usize, 3)
        }
        0x4e => {
            let bytes = script.get(1..5)?;
            (u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize, 5)
        }
        _ => return None,
    };
    let payload = script.get(header..header + len)?;
    Some((payload, header + len))
}

/// Protocols recognized by prefix inside OP_RETURN payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpReturnProtocol {
    Omni,
    OpenTimestamps,
    Unknown,
}

impl OpReturnProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpReturnProtocol::Omni => "omni",
            OpReturnProtocol::OpenTimestamps => "opentimestamps",
            OpReturnProtocol::Unknown => "unknown",
        }
    }
}

/// Decoded OP_RETURN payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpReturnData {
    /// Concatenation of every push payload after the leading OP_RETURN.
    pub data: Vec<u8>,
    /// UTF-8 rendering of `data`, absent when any byte sequence is invalid.
    pub utf8: Option<String>,
    pub protocol: OpReturnProtocol,
}

/// Extracts the data carried by an OP_RETURN output script.
///
/// Push opcodes after the leading `0x6a` are consumed until the first
/// non-push byte (or a malformed push) and their payloads concatenated.
pub fn decode_op_return(script: &[u8]) -> Option<OpReturnData> {
    if script.first() != Some(&0x6a) {
        return None;
    }

    let mut data = Vec::new();
    let mut rest = &script[1..];
    while let Some((payload, consumed)) = read_push(rest) {
        data.extend_from_slice(payload);
        rest = &rest[consumed..];
    }

    let utf8 = String::from_utf8(data.clone()).ok();
    let protocol = if data.starts_with(&[0x6f, 0x6d, 0x6e, 0x69]) {
        OpReturnProtocol::Omni
    } else if data.starts_with(&[0x01, 0x09, 0xf9, 0x11, 0x02]) {
        OpReturnProtocol::OpenTimestamps
    } else {
        OpReturnProtocol::Unknown
    };

    Some(OpReturnData { data, utf8, protocol })
}
