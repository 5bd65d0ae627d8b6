use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256: the identifier hash for transactions and headers.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Double SHA-256 over a preimage assembled from buffer slices, avoiding an
/// intermediate copy when the parts come from offset bookkeeping.
pub fn sha256d_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let first: [u8; 32] = hasher.finalize().into();
    sha256(&first)
}

/// SHA-256 then RIPEMD-160, the address hash.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_of_empty_input() {
        // dsha256("") is a fixed, widely published value.
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn parts_hash_equals_contiguous_hash() {
        let data = b"chain lens forensic analyzer";
        assert_eq!(sha256d_parts(&[&data[..5], &data[5..]]), sha256d(data));
        assert_eq!(sha256d_parts(&[data]), sha256d(data));
    }

    #[test]
    fn hash160_is_20_bytes_and_deterministic() {
        let a = hash160(b"abc");
        let b = hash160(b"abc");
        assert_eq!(a, b);
        assert_ne!(hash160(b"abd"), a);
    }
}
