//! Destination address parsing

use crate::error::{FaucetError, FaucetResult};
use bech32::{primitives::decode::CheckedHrpstring, Bech32m, Hrp};
use tracing::debug;

pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte account address in Bech32m form, e.g. `astria1...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32mAddress {
    pub address: String,
    pub prefix: String,
    pub bytes: [u8; ADDRESS_LENGTH],
}

impl std::fmt::Display for Bech32mAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

pub fn has_hex_prefix(s: &str) -> bool {
    s.len() >= 2 && s.as_bytes()[0] == b'0' && (s.as_bytes()[1] == b'x' || s.as_bytes()[1] == b'X')
}

fn is_hex_shaped(input: &str) -> bool {
    has_hex_prefix(input) || input.len() == ADDRESS_LENGTH * 2
}

/// Parse an account address, either hex or Bech32m.
///
/// Hex input (with `0x` or exactly 40 digits) goes through [`parse_hex_address`];
/// anything else must be a Bech32m string carrying 20 bytes.
pub fn parse_address(input: &str) -> FaucetResult<[u8; ADDRESS_LENGTH]> {
    if is_hex_shaped(input) {
        parse_hex_address(input)
    } else {
        parse_bech32m_address(input).map(|address| address.bytes)
    }
}

/// Parse a hex account address.
///
/// Mixed-case input is treated as EIP-55 checksummed and must verify;
/// all-lowercase or all-uppercase input is accepted as is.
pub fn parse_hex_address(input: &str) -> FaucetResult<[u8; ADDRESS_LENGTH]> {
    let digits = if has_hex_prefix(input) { &input[2..] } else { input };

    if digits.len() != ADDRESS_LENGTH * 2 {
        return Err(FaucetError::InvalidAddress(format!(
            "expected {} hex digits, got {}",
            ADDRESS_LENGTH * 2,
            digits.len()
        )));
    }

    let bytes = hex::decode(digits)
        .map_err(|e| FaucetError::InvalidAddress(e.to_string()))?;
    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&address)[2..] != *digits {
        return Err(FaucetError::InvalidAddress("checksum mismatch".to_string()));
    }

    Ok(address)
}

/// Decode a Bech32m address. Plain Bech32 checksums are rejected.
pub fn parse_bech32m_address(input: &str) -> FaucetResult<Bech32mAddress> {
    let checked = CheckedHrpstring::new::<Bech32m>(input)
        .map_err(|e| FaucetError::InvalidAddress(format!("not a hex or bech32m address: {}", e)))?;

    let data: Vec<u8> = checked.byte_iter().collect();
    let bytes: [u8; ADDRESS_LENGTH] = data.as_slice().try_into().map_err(|_| {
        FaucetError::InvalidAddress(format!(
            "expected {} bytes in bech32m payload, got {}",
            ADDRESS_LENGTH,
            data.len()
        ))
    })?;

    let address = bech32m_from_bytes(&checked.hrp().to_lowercase(), &bytes)?;
    debug!(address = %input, normalized = %address, "parsed bech32m address");
    Ok(address)
}

/// Encode 20 address bytes as Bech32m under `prefix`.
pub fn bech32m_from_bytes(prefix: &str, bytes: &[u8; ADDRESS_LENGTH]) -> FaucetResult<Bech32mAddress> {
    let hrp = Hrp::parse(prefix)
        .map_err(|e| FaucetError::InvalidAddress(format!("bech32m prefix {}: {}", prefix, e)))?;
    let address = bech32::encode::<Bech32m>(hrp, bytes)
        .map_err(|e| FaucetError::InvalidAddress(format!("failed to encode bech32m: {}", e)))?;

    Ok(Bech32mAddress {
        address,
        prefix: hrp.to_lowercase(),
        bytes: *bytes,
    })
}

/// EIP-55 mixed-case encoding with `0x` prefix.
pub fn to_checksum_address(address: &[u8; ADDRESS_LENGTH]) -> String {
    let lower = hex::encode(address);
    let hash = keccak_hash::keccak(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash.0[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
