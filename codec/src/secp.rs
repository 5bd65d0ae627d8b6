//! Modular arithmetic over the secp256k1 base field, implemented directly on
//! four 64-bit limbs. Only what point recovery needs: no group law, and no
//! constant-time discipline since nothing here is secret.

use chain_lens_types::DecodeError;

/// A field element: limbs least significant first, fully reduced.
type Fe = [u64; 4];

/// The secp256k1 prime `2^256 - 2^32 - 977`.
const P: Fe = [
    0xffff_fffe_ffff_fc2f,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
];

/// `2^256 mod p`, the folding constant for reduction.
const FOLD: u128 = 0x1_0000_03d1;

/// Recovers the y-coordinate with the requested parity for an x-coordinate
/// on `y² = x³ + 7`. Fails with [`DecodeError::CurvePointInvalid`] when `x`
/// is out of range or `x³ + 7` has no square root.
pub fn lift_x(x_bytes: &[u8; 32], odd: bool) -> Result<[u8; 32], DecodeError> {
    let x = fe_from_bytes(x_bytes);
    if gte(&x, &P) {
        return Err(DecodeError::CurvePointInvalid);
    }

    let x3 = mul(&mul(&x, &x), &x);
    let a = add(&x3, &[7, 0, 0, 0]);

    // p ≡ 3 (mod 4), so a^((p+1)/4) is a square root whenever one exists.
    let mut y = pow(&a, &sqrt_exponent());
    if mul(&y, &y) != a {
        return Err(DecodeError::CurvePointInvalid);
    }
    if (y[0] & 1 == 1) != odd {
        y = neg(&y);
    }
    Ok(fe_to_bytes(&y))
}

fn fe_from_bytes(bytes: &[u8; 32]) -> Fe {
    let mut limbs = [0u64; 4];
    for i in 0..4 {
        let mut limb = 0u64;
        for j in 0..8 {
            limb = (limb << 8) | bytes[i * 8 + j] as u64;
        }
        limbs[3 - i] = limb;
    }
    limbs
}

fn fe_to_bytes(a: &Fe) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..4 {
        out[i * 8..(i + 1) * 8].copy_from_slice(&a[3 - i].to_be_bytes());
    }
    out
}

fn gte(a: &Fe, b: &Fe) -> bool {
    for i in (0..4).rev() {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    true
}

/// `a - b`, requiring `a >= b`.
fn sub_raw(a: &Fe, b: &Fe) -> Fe {
    let mut out = [0u64; 4];
    let mut borrow = 0u64;
    for i in 0..4 {
        let (d, under1) = a[i].overflowing_sub(b[i]);
        let (d, under2) = d.overflowing_sub(borrow);
        out[i] = d;
        borrow = (under1 | under2) as u64;
    }
    out
}

fn add(a: &Fe, b: &Fe) -> Fe {
    let mut out = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let v = a[i] as u128 + b[i] as u128 + carry;
        out[i] = v as u64;
        carry = v >> 64;
    }
    if carry != 0 {
        // Wrapped 2^256: fold once. The result stays below 2^256 because
        // both operands were reduced.
        ripple_add(&mut out, FOLD);
    }
    if gte(&out, &P) {
        out = sub_raw(&out, &P);
    }
    out
}

fn neg(a: &Fe) -> Fe {
    if *a == [0, 0, 0, 0] {
        *a
    } else {
        sub_raw(&P, a)
    }
}

fn mul(a: &Fe, b: &Fe) -> Fe {
    // Schoolbook 4x4 into 8 limbs.
    let mut wide = [0u64; 8];
    for i in 0..4 {
        let mut carry = 0u128;
        for j in 0..4 {
            let v = wide[i + j] as u128 + a[i] as u128 * b[j] as u128 + carry;
            wide[i + j] = v as u64;
            carry = v >> 64;
        }
        wide[i + 4] = carry as u64;
    }
    reduce(&wide)
}

/// Folds a 512-bit product into the field via `2^256 ≡ 2^32 + 977 (mod p)`.
fn reduce(wide: &[u64; 8]) -> Fe {
    let mut out = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let v = wide[i] as u128 + wide[i + 4] as u128 * FOLD + carry;
        out[i] = v as u64;
        carry = v >> 64;
    }

    // The leftover is at most ~34 bits; folding it can wrap 2^256 at most
    // once more, and that second wrap folds without overflow.
    let mut pending = carry * FOLD;
    while pending != 0 {
        pending = if ripple_add(&mut out, pending) { FOLD } else { 0 };
    }

    while gte(&out, &P) {
        out = sub_raw(&out, &P);
    }
    out
}

/// Adds a 128-bit value into the limbs; true if the sum wrapped 2^256.
fn ripple_add(out: &mut Fe, value: u128) -> bool {
    let mut carry = value;
    for limb in out.iter_mut() {
        if carry == 0 {
            return false;
        }
        let v = *limb as u128 + (carry as u64) as u128;
        *limb = v as u64;
        carry = (carry >> 64) + (v >> 64);
    }
    carry != 0
}

fn pow(base: &Fe, exponent: &Fe) -> Fe {
    let mut result: Fe = [1, 0, 0, 0];
    for i in (0..4).rev() {
        for bit in (0..64).rev() {
            result = mul(&result, &result);
            if (exponent[i] >> bit) & 1 == 1 {
                result = mul(&result, base);
            }
        }
    }
    result
}

/// `(p + 1) / 4`, the square-root exponent for `p ≡ 3 (mod 4)`.
fn sqrt_exponent() -> Fe {
    let mut e = P;
    e[0] += 1;
    let mut out = [0u64; 4];
    for i in 0..4 {
        out[i] = (e[i] >> 2) | if i < 3 { e[i + 1] << 62 } else { 0 };
    }
    out
}
