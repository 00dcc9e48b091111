//! Channel encryption.
//!
//! Mesh payloads are AES-CTR keystream XORs: encrypt and decrypt are the
//! same operation. The 16-byte nonce binds the keystream to the sending node
//! and the sender-assigned packet id:
//!
//! ```text
//! nonce[0..8]  = packet id as u64, little-endian
//! nonce[8..16] = source node as u64, little-endian
//! ```
//!
//! There is no integrity tag; a wrong key or tampered ciphertext surfaces as
//! a payload that no longer parses.

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use prost::Message;

use crate::error::{RadioError, Result};
use fauxmesh_proto::{mesh_packet::PayloadVariant, Data, MeshPacket};

/// The well-known default channel key, usually written `AQ==`.
pub const DEFAULT_PSK: [u8; 16] = [
    0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59, 0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69,
    0x01,
];

fn build_nonce(packet_id: u32, from_node: u32) -> [u8; 16] {
    let mut nonce = [0u8; 16];
    nonce[0..8].copy_from_slice(&u64::from(packet_id).to_le_bytes());
    nonce[8..16].copy_from_slice(&u64::from(from_node).to_le_bytes());
    nonce
}

/// XOR `data` with the AES-CTR keystream derived from `(key, packet_id,
/// from_node)`. Applying the function twice returns the original bytes.
///
/// Keys must be 16, 24 or 32 bytes; anything else is
/// [`RadioError::InvalidKey`].
pub fn xor_crypt(data: &[u8], key: &[u8], packet_id: u32, from_node: u32) -> Result<Vec<u8>> {
    let nonce = build_nonce(packet_id, from_node);
    let mut buf = data.to_vec();
    match key.len() {
        16 => Ctr128BE::<Aes128>::new_from_slices(key, &nonce)
            .map_err(|_| RadioError::InvalidKey { len: key.len() })?
            .apply_keystream(&mut buf),
        24 => Ctr128BE::<Aes192>::new_from_slices(key, &nonce)
            .map_err(|_| RadioError::InvalidKey { len: key.len() })?
            .apply_keystream(&mut buf),
        32 => Ctr128BE::<Aes256>::new_from_slices(key, &nonce)
            .map_err(|_| RadioError::InvalidKey { len: key.len() })?
            .apply_keystream(&mut buf),
        len => return Err(RadioError::InvalidKey { len }),
    }
    Ok(buf)
}

fn xor_fold(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// The 8-bit digest a channel advertises on-air, the XOR fold of its name
/// XORed with the fold of its key. An empty key is [`RadioError::EmptyKey`].
pub fn channel_hash(name: &str, key: &[u8]) -> Result<u32> {
    if key.is_empty() {
        return Err(RadioError::EmptyKey);
    }
    Ok(u32::from(xor_fold(name.as_bytes()) ^ xor_fold(key)))
}

/// Extract the [`Data`] from a packet, decrypting with `key` if needed.
///
/// Cleartext packets pass through unchanged. Ciphertext that decrypts into
/// something that does not parse as [`Data`] is [`RadioError::Decrypt`]; a
/// packet with no payload at all is [`RadioError::UnknownPayloadType`].
pub fn try_decode(packet: &MeshPacket, key: &[u8]) -> Result<Data> {
    match &packet.payload_variant {
        Some(PayloadVariant::Decoded(data)) => Ok(data.clone()),
        Some(PayloadVariant::Encrypted(ciphertext)) => {
            let plaintext = xor_crypt(ciphertext, key, packet.id, packet.from)?;
            Data::decode(plaintext.as_slice()).map_err(|_| RadioError::Decrypt)
        }
        None => Err(RadioError::UnknownPayloadType),
    }
}
