use crate::config::PERSONAL_MESSAGE_PREFIX;
use crate::crypto::hash::keccak256_multi;

/// ERC-191 `personal_sign` digest:
/// `keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)`, with the
/// byte length written in decimal.
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let length = message.len().to_string();
    keccak256_multi(&[PERSONAL_MESSAGE_PREFIX.as_bytes(), length.as_bytes(), message])
}
