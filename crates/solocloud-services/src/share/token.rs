use base64::Engine;
use rand::RngCore;
use solocloud_core::constants::SHARE_TOKEN_BYTES;

/// Fresh share token: 256 bits from the OS-seeded CSPRNG, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
