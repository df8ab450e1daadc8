//! LNURL-auth primitives.
//!
//! Implements the cryptographic half of the LNURL-auth (LUD-04) pattern:
//! random `k1` nonces, bech32 LNURL encoding of the callback URI, and ECDSA
//! signature verification over `k1` under a secp256k1 linking key. The
//! challenge lifecycle around these lives in `verikit-engine`.

use bech32::{ToBase32, Variant};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};

use crate::config::LnurlServerConfig;
use crate::{Result, VerikitError};

/// Size of the k1 challenge nonce in bytes.
pub const K1_LEN: usize = 32;

/// Length of a compressed secp256k1 public key in bytes.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Generate a fresh random k1 nonce, hex-encoded.
pub fn generate_k1() -> String {
    let mut bytes = [0u8; K1_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Decode and validate a hex k1 nonce.
pub fn decode_k1(k1: &str) -> Result<[u8; K1_LEN]> {
    let bytes = hex::decode(k1)
        .map_err(|e| VerikitError::invalid_data("k1", format!("not hexadecimal: {}", e)))?;
    bytes.try_into().map_err(|_| {
        VerikitError::invalid_data("k1", format!("expected {} bytes", K1_LEN))
    })
}

/// Build the plain callback URL a wallet will GET after signing.
///
/// Follows the LUD-04 shape: `tag=login`, the nonce in `k1`, and the action
/// hint. The scheme is always https; LNURL wallets refuse anything else.
pub fn build_callback_url(config: &LnurlServerConfig, k1: &str) -> String {
    format!(
        "https://{}{}?tag=login&k1={}&action=login",
        config.domain.trim_end_matches('/'),
        config.callback_path,
        k1
    )
}

/// Bech32-encode a callback URL into an `lnurl1...` string.
pub fn encode_lnurl(url: &str) -> Result<String> {
    bech32::encode("lnurl", url.as_bytes().to_base32(), Variant::Bech32)
        .map_err(|e| VerikitError::Internal(format!("bech32 encoding failed: {}", e)))
}

/// QR-encodable representation of an LNURL.
///
/// Uppercase, so QR encoders can use the smaller alphanumeric mode.
pub fn qr_payload(lnurl: &str) -> String {
    lnurl.to_ascii_uppercase()
}

/// Verify an LNURL-auth signature.
///
/// `sig` is a DER-encoded (or 64-byte compact) ECDSA signature over the raw
/// 32-byte `k1` digest; `pubkey` is the wallet's compressed linking key.
///
/// Returns `Ok(false)` when the signature is well-formed but does not
/// validate - that is a policy rejection, recorded against the challenge.
/// Malformed hex or key/signature shapes return `Err(InvalidData)` instead:
/// those are rejected before the challenge is touched.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(sig), fields(pubkey = %pubkey)))]
pub fn verify_auth_signature(k1: &str, sig: &str, pubkey: &str) -> Result<bool> {
    let k1_bytes = decode_k1(k1)?;

    let sig_bytes = hex::decode(sig)
        .map_err(|e| VerikitError::invalid_data("sig", format!("not hexadecimal: {}", e)))?;
    let signature = Signature::from_der(&sig_bytes)
        .or_else(|_| Signature::from_compact(&sig_bytes))
        .map_err(|e| VerikitError::invalid_data("sig", format!("bad signature encoding: {}", e)))?;

    let pubkey_bytes = hex::decode(pubkey)
        .map_err(|e| VerikitError::invalid_data("pubkey", format!("not hexadecimal: {}", e)))?;
    if pubkey_bytes.len() != COMPRESSED_PUBKEY_LEN {
        return Err(VerikitError::invalid_data(
            "pubkey",
            format!("expected {} bytes (compressed)", COMPRESSED_PUBKEY_LEN),
        ));
    }
    let public_key = PublicKey::from_slice(&pubkey_bytes)
        .map_err(|e| VerikitError::invalid_data("pubkey", format!("not a valid point: {}", e)))?;

    let message = Message::from_digest_slice(&k1_bytes)
        .map_err(|e| VerikitError::Internal(format!("invalid digest: {}", e)))?;

    let secp = Secp256k1::verification_only();
    Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
}
