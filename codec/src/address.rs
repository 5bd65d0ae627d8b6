//! Base58Check and Bech32/Bech32m address encoding (BIP173, BIP350).

use crate::hash::sha256d;
use chain_lens_types::{ClassifiedKind, DecodeError, Network};

const BASE58_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const BECH32_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const BECH32M_CONST: u32 = 0x2bc8_30a3;

fn p2pkh_version(network: Network) -> u8 {
    match network {
        Network::Mainnet => 0x00,
        Network::Testnet => 0x6f,
    }
}

fn p2sh_version(network: Network) -> u8 {
    match network {
        Network::Mainnet => 0x05,
        Network::Testnet => 0xc4,
    }
}

fn hrp(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "bc",
        Network::Testnet => "tb",
    }
}

/// Derives the canonical address for a classified scriptPubKey.
///
/// Bare pubkey, bare multisig, OP_RETURN, and unknown scripts have no
/// address form.
pub fn derive_address(script: &[u8], kind: ClassifiedKind, network: Network) -> Option<String> {
    match kind {
        ClassifiedKind::P2pkh => {
            Some(base58check_encode(p2pkh_version(network), &script[3..23]))
        }
        ClassifiedKind::P2sh => Some(base58check_encode(p2sh_version(network), &script[2..22])),
        ClassifiedKind::P2wpkh => segwit_address_encode(network, 0, &script[2..22]).ok(),
        ClassifiedKind::P2wsh => segwit_address_encode(network, 0, &script[2..34]).ok(),
        ClassifiedKind::P2tr => segwit_address_encode(network, 1, &script[2..34]).ok(),
        _ => None,
    }
}

/// Rebuilds the scriptPubKey an address pays to; the inverse of
/// [`derive_address`].
pub fn address_to_script(address: &str, network: Network) -> Result<Vec<u8>, DecodeError> {
    if address.starts_with(hrp(network)) && address.as_bytes().get(2) == Some(&b'1') {
        let (version, program) = segwit_address_decode(network, address)?;
        let mut script = Vec::with_capacity(2 + program.len());
        script.push(if version == 0 { 0x00 } else { 0x50 + version });
        script.push(program.len() as u8);
        script.extend_from_slice(&program);
        return Ok(script);
    }

    // Checksum-valid base58 whose version or payload shape selects no
    // known template is a template failure, not an encoding one.
    let (version, payload) = base58check_decode(address)?;
    if payload.len() != 20 {
        return Err(DecodeError::InvalidTemplate);
    }
    if version == p2pkh_version(network) {
        let mut script = vec![0x76, 0xa9, 0x14];
        script.extend_from_slice(&payload);
        script.extend_from_slice(&[0x88, 0xac]);
        Ok(script)
    } else if version == p2sh_version(network) {
        let mut script = vec![0xa9, 0x14];
        script.extend_from_slice(&payload);
        script.push(0x87);
        Ok(script)
    } else {
        Err(DecodeError::InvalidTemplate)
    }
}

/// Base58Check: `version || payload || dsha256(version || payload)[0..4]`.
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 5);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = sha256d(&data);
    data.extend_from_slice(&checksum[..4]);
    base58_encode(&data)
}

/// Decodes and checksum-verifies; returns the version byte and payload.
pub fn base58check_decode(encoded: &str) -> Result<(u8, Vec<u8>), DecodeError> {
    let data = base58_decode(encoded)?;
    if data.len() < 5 {
        return Err(DecodeError::InvalidEncoding(
            "base58 string too short for a checksum".to_string(),
        ));
    }
    let (body, checksum) = data.split_at(data.len() - 4);
    let expected = sha256d(body);
    if checksum != &expected[..4] {
        return Err(DecodeError::InvalidEncoding("base58 checksum mismatch".to_string()));
    }
    Ok((body[0], body[1..].to_vec()))
}

fn base58_encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|byte| **byte == 0).count();

    // Repeated division: digits accumulate least significant first.
    let mut digits: Vec<u8> = Vec::new();
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(BASE58_ALPHABET[digit as usize] as char);
    }
    out
}

fn base58_decode(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let zeros = encoded.bytes().take_while(|byte| *byte == b'1').count();

    let mut bytes: Vec<u8> = Vec::new();
    for ch in encoded.bytes() {
        let digit = BASE58_ALPHABET
            .iter()
            .position(|c| *c == ch)
            .ok_or_else(|| {
                DecodeError::InvalidEncoding(format!("{:?} is not a base58 character", ch as char))
            })?;
        let mut carry = digit as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = carry as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push(carry as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// Encodes a witness program as a segwit address: Bech32 for version 0,
/// Bech32m for version 1 and above.
pub fn segwit_address_encode(
    network: Network,
    witness_version: u8,
    program: &[u8],
) -> Result<String, DecodeError> {
    check_program(witness_version, program.len())?;

    let mut data = vec![witness_version];
    data.extend(convert_bits_8_to_5(program));

    let constant = if witness_version == 0 { 1 } else { BECH32M_CONST };
    let mut values = hrp_expand(hrp(network));
    values.extend_from_slice(&data);
    values.extend_from_slice(&[0u8; 6]);
    let polymod = bech32_polymod(&values) ^ constant;

    let mut out = String::from(hrp(network));
    out.push('1');
    for digit in &data {
        out.push(BECH32_CHARSET[*digit as usize] as char);
    }
    for i in 0..6 {
        out.push(BECH32_CHARSET[((polymod >> (5 * (5 - i))) & 0x1f) as usize] as char);
    }
    Ok(out)
}

/// Decodes and checksum-verifies a segwit address against the network's HRP;
/// returns the witness version and program.
pub fn segwit_address_decode(
    network: Network,
    address: &str,
) -> Result<(u8, Vec<u8>), DecodeError> {
    if address.bytes().any(|b| b.is_ascii_uppercase())
        && address.bytes().any(|b| b.is_ascii_lowercase())
    {
        return Err(DecodeError::InvalidEncoding("mixed-case bech32 string".to_string()));
    }
    let address = address.to_ascii_lowercase();

    let (found_hrp, rest) = address
        .rsplit_once('1')
        .ok_or_else(|| DecodeError::InvalidEncoding("bech32 string has no separator".to_string()))?;
    if found_hrp != hrp(network) {
        return Err(DecodeError::InvalidEncoding(format!(
            "HRP {found_hrp:?} does not match the requested network"
        )));
    }
    if rest.len() < 7 {
        return Err(DecodeError::InvalidEncoding("bech32 data part too short".to_string()));
    }

    let mut data = Vec::with_capacity(rest.len());
    for ch in rest.bytes() {
        let digit = BECH32_CHARSET.iter().position(|c| *c == ch).ok_or_else(|| {
            DecodeError::InvalidEncoding(format!("{:?} is not a bech32 character", ch as char))
        })?;
        data.push(digit as u8);
    }

    let witness_version = data[0];
    if witness_version > 16 {
        return Err(DecodeError::UnsupportedWitnessVersion {
            version: witness_version,
            program_len: 0,
        });
    }

    let constant = if witness_version == 0 { 1 } else { BECH32M_CONST };
    let mut values = hrp_expand(found_hrp);
    values.extend_from_slice(&data);
    if bech32_polymod(&values) != constant {
        return Err(DecodeError::InvalidEncoding("bech32 checksum mismatch".to_string()));
    }

    let program = convert_bits_5_to_8(&data[1..data.len() - 6])?;
    check_program(witness_version, program.len())?;
    Ok((witness_version, program))
}

/// Witness program bounds: 20 or 32 bytes for version 0; 2..=40 for 1..=16.
fn check_program(witness_version: u8, program_len: usize) -> Result<(), DecodeError> {
    let valid = match witness_version {
        0 => program_len == 20 || program_len == 32,
        1..=16 => (2..=40).contains(&program_len),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DecodeError::UnsupportedWitnessVersion {
            version: witness_version,
            program_len,
        })
    }
}

fn bech32_polymod(values: &[u8]) -> u32 {
    const GENERATOR: [u32; 5] = [
        0x3b6a_57b2,
        0x2650_8e6d,
        0x1ea1_19fa,
        0x3d42_33dd,
        0x2a14_62b3,
    ];
    let mut chk: u32 = 1;
    for &value in values {
        let top = chk >> 25;
        chk = (chk & 0x1ff_ffff) << 5 ^ value as u32;
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let mut out: Vec<u8> = hrp.bytes().map(|b| b >> 5).collect();
    out.push(0);
    out.extend(hrp.bytes().map(|b| b & 0x1f));
    out
}

fn convert_bits_8_to_5(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    out
}

fn convert_bits_5_to_8(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &digit in data {
        acc = (acc << 5) | digit as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xff) as u8);
        }
    }
    // Strict padding: at most four leftover bits, all zero.
    if bits >= 5 || (acc << (8 - bits)) & 0xff != 0 {
        return Err(DecodeError::InvalidEncoding("invalid bech32 padding".to_string()));
    }
    Ok(out)
}
