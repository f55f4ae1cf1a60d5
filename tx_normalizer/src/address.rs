//! Address validation and display formatting for both ledgers.

use crate::error::{NormalizeError, Result};
use sha2::{Digest, Sha256};

/// Version byte of TRON mainnet addresses
const TRON_ADDRESS_PREFIX: u8 = 0x41;
const TRON_ADDRESS_LEN: usize = 21;

fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// True for the internal hex form: `41` followed by 40 hex characters
pub fn is_tron_hex_address(address: &str) -> bool {
    address.len() == TRON_ADDRESS_LEN * 2
        && address.chars().all(|c| c.is_ascii_hexdigit())
        && address.starts_with("41")
}

/// Convert a TRON hex address into its base58check display form
pub fn tron_hex_to_base58(hex_address: &str) -> Result<String> {
    let bytes = hex::decode(hex_address).map_err(|_| NormalizeError::InvalidAddress {
        address: hex_address.to_string(),
    })?;

    if bytes.len() != TRON_ADDRESS_LEN || bytes[0] != TRON_ADDRESS_PREFIX {
        return Err(NormalizeError::InvalidAddress {
            address: hex_address.to_string(),
        });
    }

    let mut payload = bytes;
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    Ok(bs58::encode(payload).into_string())
}

/// Display form of a TRON address: hex input is converted, anything else passes through
pub fn tron_display_address(address: &str) -> String {
    if is_tron_hex_address(address) {
        tron_hex_to_base58(address).unwrap_or_else(|_| address.to_string())
    } else {
        address.to_string()
    }
}

/// `T` prefix, 34 base58 characters and a valid checksum
pub fn is_valid_tron_address(address: &str) -> bool {
    if !address.starts_with('T') || address.len() != 34 {
        return false;
    }

    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    if decoded.len() != TRON_ADDRESS_LEN + 4 || decoded[0] != TRON_ADDRESS_PREFIX {
        return false;
    }

    let (payload, check) = decoded.split_at(TRON_ADDRESS_LEN);
    checksum(payload) == check
}

/// `0x` followed by 40 hex characters, any case
pub fn is_valid_eth_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn same_eth_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
