use serde::Serialize;

/// Script classification over the canonical templates.
///
/// The first nine variants apply to outputs. The remaining four are input
/// refinements that additionally require the spent prevout and, for segwit,
/// the witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedKind {
    P2pk,
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Multisig,
    OpReturn,
    Unknown,
    P2shP2wpkh,
    P2shP2wsh,
    P2trKeypath,
    P2trScriptpath,
}

impl ClassifiedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifiedKind::P2pk => "p2pk",
            ClassifiedKind::P2pkh => "p2pkh",
            ClassifiedKind::P2sh => "p2sh",
            ClassifiedKind::P2wpkh => "p2wpkh",
            ClassifiedKind::P2wsh => "p2wsh",
            ClassifiedKind::P2tr => "p2tr",
            ClassifiedKind::Multisig => "multisig",
            ClassifiedKind::OpReturn => "op_return",
            ClassifiedKind::Unknown => "unknown",
            ClassifiedKind::P2shP2wpkh => "p2sh_p2wpkh",
            ClassifiedKind::P2shP2wsh => "p2sh_p2wsh",
            ClassifiedKind::P2trKeypath => "p2tr_keypath",
            ClassifiedKind::P2trScriptpath => "p2tr_scriptpath",
        }
    }
}

/// Interpretation of the transaction-level `locktime` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTimeKind {
    None,
    Height(u32),
    UnixTime(u32),
}

impl LockTimeKind {
    pub fn label(&self) -> &'static str {
        match self {
            LockTimeKind::None => "none",
            LockTimeKind::Height(_) => "block_height",
            LockTimeKind::UnixTime(_) => "unix_timestamp",
        }
    }
}

/// A BIP68 relative timelock decoded from an input's sequence field.
///
/// A sequence with bit 31 set carries no relative lock; callers model that
/// as the absence of a `RelativeLock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeLock {
    Blocks(u16),
    Time { seconds: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_match_serialized_form() {
        for kind in [
            ClassifiedKind::P2pkh,
            ClassifiedKind::OpReturn,
            ClassifiedKind::P2shP2wpkh,
            ClassifiedKind::P2trScriptpath,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
