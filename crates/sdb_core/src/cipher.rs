//! Per-record stream cipher used to obscure string payloads.
//!
//! Each byte is XORed with the previous *ciphertext* byte. The very first key byte is derived from the
//! absolute file address of the record, so every record can be revealed on its own without any state
//! carried over from its neighbours.

use tracing::trace;

/// Value mixed into the low byte of a record address to form the initial key
const SEED_MASK: u8 = 0xCD;

/// Initial key byte for a record stored at `address`
#[inline]
pub fn seed(address: u32) -> u8 {
    (address & 0xFF) as u8 ^ SEED_MASK
}

/// Reveal an obscured payload stored at `address`, returning the plaintext bytes
pub fn reveal(ciphertext: &[u8], address: u32) -> Vec<u8> {
    let mut buffer = ciphertext.to_vec();
    reveal_in_place(&mut buffer, address);
    buffer
}

/// Obscure a plaintext payload that will be stored at `address`, returning the ciphertext bytes
pub fn obscure(plaintext: &[u8], address: u32) -> Vec<u8> {
    let mut buffer = plaintext.to_vec();
    obscure_in_place(&mut buffer, address);
    buffer
}

/// In-place variant of [`reveal`]
pub fn reveal_in_place(data: &mut [u8], address: u32) {
    trace!("revealing {} bytes at {:#x}", data.len(), address);

    let mut key = seed(address);
    for byte in data.iter_mut() {
        let current = *byte;
        *byte = current ^ key;
        key = current;
    }
}

/// In-place variant of [`obscure`]
pub fn obscure_in_place(data: &mut [u8], address: u32) {
    trace!("obscuring {} bytes at {:#x}", data.len(), address);

    let mut key = seed(address);
    for byte in data.iter_mut() {
        *byte ^= key;
        key = *byte;
    }
}
