//! The dense opcode name table and the script disassembler.

/// Name of every defined opcode, indexed by byte value.
///
/// Empty entries have no assigned mnemonic and disassemble as
/// `OP_UNKNOWN_0xNN`.
#[rustfmt::skip]
pub const OPCODE_NAMES: [&str; 256] = [
    // 0x00..0x4e: constants and pushes
    "OP_0",
    "OP_PUSHBYTES_1", "OP_PUSHBYTES_2", "OP_PUSHBYTES_3", "OP_PUSHBYTES_4",
    "OP_PUSHBYTES_5", "OP_PUSHBYTES_6", "OP_PUSHBYTES_7", "OP_PUSHBYTES_8",
    "OP_PUSHBYTES_9", "OP_PUSHBYTES_10", "OP_PUSHBYTES_11", "OP_PUSHBYTES_12",
    "OP_PUSHBYTES_13", "OP_PUSHBYTES_14", "OP_PUSHBYTES_15", "OP_PUSHBYTES_16",
    "OP_PUSHBYTES_17", "OP_PUSHBYTES_18", "OP_PUSHBYTES_19", "OP_PUSHBYTES_20",
    "OP_PUSHBYTES_21", "OP_PUSHBYTES_22", "OP_PUSHBYTES_23", "OP_PUSHBYTES_24",
    "OP_PUSHBYTES_25", "OP_PUSHBYTES_26", "OP_PUSHBYTES_27", "OP_PUSHBYTES_28",
    "OP_PUSHBYTES_29", "OP_PUSHBYTES_30", "OP_PUSHBYTES_31", "OP_PUSHBYTES_32",
    "OP_PUSHBYTES_33", "OP_PUSHBYTES_34", "OP_PUSHBYTES_35", "OP_PUSHBYTES_36",
    "OP_PUSHBYTES_37", "OP_PUSHBYTES_38", "OP_PUSHBYTES_39", "OP_PUSHBYTES_40",
    "OP_PUSHBYTES_41", "OP_PUSHBYTES_42", "OP_PUSHBYTES_43", "OP_PUSHBYTES_44",
    "OP_PUSHBYTES_45", "OP_PUSHBYTES_46", "OP_PUSHBYTES_47", "OP_PUSHBYTES_48",
    "OP_PUSHBYTES_49", "OP_PUSHBYTES_50", "OP_PUSHBYTES_51", "OP_PUSHBYTES_52",
    "OP_PUSHBYTES_53", "OP_PUSHBYTES_54", "OP_PUSHBYTES_55", "OP_PUSHBYTES_56",
    "OP_PUSHBYTES_57", "OP_PUSHBYTES_58", "OP_PUSHBYTES_59", "OP_PUSHBYTES_60",
    "OP_PUSHBYTES_61", "OP_PUSHBYTES_62", "OP_PUSHBYTES_63", "OP_PUSHBYTES_64",
    "OP_PUSHBYTES_65", "OP_PUSHBYTES_66", "OP_PUSHBYTES_67", "OP_PUSHBYTES_68",
    "OP_PUSHBYTES_69", "OP_PUSHBYTES_70", "OP_PUSHBYTES_71", "OP_PUSHBYTES_72",
    "OP_PUSHBYTES_73", "OP_PUSHBYTES_74", "OP_PUSHBYTES_75",
    "OP_PUSHDATA1", "OP_PUSHDATA2", "OP_PUSHDATA4",
    // 0x4f..0x60: numbers
    "OP_1NEGATE", "OP_RESERVED",
    "OP_1", "OP_2", "OP_3", "OP_4", "OP_5", "OP_6", "OP_7", "OP_8",
    "OP_9", "OP_10", "OP_11", "OP_12", "OP_13", "OP_14", "OP_15", "OP_16",
    // 0x61..0x6a: control flow
    "OP_NOP", "OP_VER", "OP_IF", "OP_NOTIF", "OP_VERIF", "OP_VERNOTIF",
    "OP_ELSE", "OP_ENDIF", "OP_VERIFY", "OP_RETURN",
    // 0x6b..0x7d: stack
    "OP_TOALTSTACK", "OP_FROMALTSTACK", "OP_2DROP", "OP_2DUP", "OP_3DUP",
    "OP_2OVER", "OP_2ROT", "OP_2SWAP", "OP_IFDUP", "OP_DEPTH", "OP_DROP",
    "OP_DUP", "OP_NIP", "OP_OVER", "OP_PICK", "OP_ROLL", "OP_ROT",
    "OP_SWAP", "OP_TUCK",
    // 0x7e..0x82: splice
    "OP_CAT", "OP_SUBSTR", "OP_LEFT", "OP_RIGHT", "OP_SIZE",
    // 0x83..0x8a: bit logic
    "OP_INVERT", "OP_AND", "OP_OR", "OP_XOR", "OP_EQUAL", "OP_EQUALVERIFY",
    "OP_RESERVED1", "OP_RESERVED2",
    // 0x8b..0xa5: arithmetic
    "OP_1ADD", "OP_1SUB", "OP_2MUL", "OP_2DIV", "OP_NEGATE", "OP_ABS",
    "OP_NOT", "OP_0NOTEQUAL", "OP_ADD", "OP_SUB", "OP_MUL", "OP_DIV",
    "OP_MOD", "OP_LSHIFT", "OP_RSHIFT", "OP_BOOLAND", "OP_BOOLOR",
    "OP_NUMEQUAL", "OP_NUMEQUALVERIFY", "OP_NUMNOTEQUAL", "OP_LESSTHAN",
    "OP_GREATERTHAN", "OP_LESSTHANOREQUAL", "OP_GREATERTHANOREQUAL",
    "OP_MIN", "OP_MAX", "OP_WITHIN",
    // 0xa6..0xba: crypto and locktime
    "OP_RIPEMD160", "OP_SHA1", "OP_SHA256", "OP_HASH160", "OP_HASH256",
    "OP_CODESEPARATOR", "OP_CHECKSIG", "OP_CHECKSIGVERIFY",
    "OP_CHECKMULTISIG", "OP_CHECKMULTISIGVERIFY", "OP_NOP1",
    "OP_CHECKLOCKTIMEVERIFY", "OP_CHECKSEQUENCEVERIFY", "OP_NOP4", "OP_NOP5",
    "OP_NOP6", "OP_NOP7", "OP_NOP8", "OP_NOP9", "OP_NOP10", "OP_CHECKSIGADD",
    // 0xbb..0xff: unassigned
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
    "", "", "", "", "",
];

/// Renders a script as space-separated human-readable tokens.
///
/// Direct pushes render as `OP_PUSHBYTES_N <hex>`; the PUSHDATA forms render
/// their decoded length and payload. A push that runs past the end of the
/// script renders whatever bytes were present followed by `OP_INVALID`.
pub fn disassemble(script: &[u8]) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut pos = 0;

    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;

        match opcode {
            0x01..=0x4b => {
                tokens.push(format!("OP_PUSHBYTES_{opcode}"));
                pos = push_payload(script, pos, opcode as usize, &mut tokens);
            }
            0x4c | 0x4d | 0x4e => {
                let (name, width) = match opcode {
                    0x4c => ("OP_PUSHDATA1", 1),
                    0x4d => ("OP_PUSHDATA2", 2),
                    _ => ("OP_PUSHDATA4", 4),
                };
                tokens.push(name.to_string());
                if pos + width > script.len() {
                    if pos < script.len() {
                        tokens.push(hex::encode(&script[pos..]));
                    }
                    tokens.push("OP_INVALID".to_string());
                    break;
                }
                let mut len = 0usize;
                for (i, byte) in script[pos..pos + width].iter().enumerate() {
                    len |= (*byte as usize) << (8 * i);
                }
                pos += width;
                tokens.push(len.to_string());
                pos = push_payload(script, pos, len, &mut tokens);
            }
            _ => {
                let name = OPCODE_NAMES[opcode as usize];
                if name.is_empty() {
                    tokens.push(format!("OP_UNKNOWN_0x{opcode:02X}"));
                } else {
                    tokens.push(name.to_string());
                }
            }
        }
    }

    tokens.join(" ")
}

fn push_payload(script: &[u8], pos: usize, len: usize, tokens: &mut Vec<String>) -> usize {
    if len == 0 {
        pos
    } else if pos + len <= script.len() {
        tokens.push(hex::encode(&script[pos..pos + len]));
        pos + len
    } else {
        if pos < script.len() {
            tokens.push(hex::encode(&script[pos..]));
        }
        tokens.push("OP_INVALID".to_string());
        script.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_lit::hex;

    #[test]
    fn table_is_dense() {
        assert_eq!(OPCODE_NAMES.len(), 256);
        assert_eq!(OPCODE_NAMES[0x00], "OP_0");
        assert_eq!(OPCODE_NAMES[0x4b], "OP_PUSHBYTES_75");
        assert_eq!(OPCODE_NAMES[0x51], "OP_1");
        assert_eq!(OPCODE_NAMES[0x60], "OP_16");
        assert_eq!(OPCODE_NAMES[0x6a], "OP_RETURN");
        assert_eq!(OPCODE_NAMES[0xac], "OP_CHECKSIG");
        assert_eq!(OPCODE_NAMES[0xb1], "OP_CHECKLOCKTIMEVERIFY");
        assert_eq!(OPCODE_NAMES[0xba], "OP_CHECKSIGADD");
        assert_eq!(OPCODE_NAMES[0xbb], "");
        assert_eq!(OPCODE_NAMES[0xff], "");
    }

    #[test]
    fn disassembles_p2pkh_template() {
        let script = hex!("76a914000102030405060708090a0b0c0d0e0f1011121388ac");
        assert_eq!(
            disassemble(&script),
            "OP_DUP OP_HASH160 OP_PUSHBYTES_20 000102030405060708090a0b0c0d0e0f10111213 \
             OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    #[test]
    fn disassembles_pushdata_forms() {
        assert_eq!(disassemble(&[0x4c, 0x02, 0xab, 0xcd]), "OP_PUSHDATA1 2 abcd");
        assert_eq!(
            disassemble(&[0x4d, 0x03, 0x00, 0x01, 0x02, 0x03]),
            "OP_PUSHDATA2 3 010203"
        );
        assert_eq!(
            disassemble(&[0x4e, 0x01, 0x00, 0x00, 0x00, 0xff]),
            "OP_PUSHDATA4 1 ff"
        );
    }

    #[test]
    fn unknown_opcodes_render_by_value() {
        assert_eq!(disassemble(&[0xbb]), "OP_UNKNOWN_0xBB");
        assert_eq!(disassemble(&[0xff]), "OP_UNKNOWN_0xFF");
    }

    #[test]
    fn truncated_push_renders_consumed_prefix() {
        // Asks for 5 bytes, only 2 available.
        assert_eq!(disassemble(&[0x05, 0xaa, 0xbb]), "OP_PUSHBYTES_5 aabb OP_INVALID");
        // PUSHDATA2 with a missing length byte.
        assert_eq!(disassemble(&[0x4d, 0x01]), "OP_PUSHDATA2 01 OP_INVALID");
        // PUSHDATA1 with no length byte at all.
        assert_eq!(disassemble(&[0x4c]), "OP_PUSHDATA1 OP_INVALID");
    }
}
