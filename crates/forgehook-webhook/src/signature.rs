use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Hex HMAC-SHA256 of `body` keyed with the hook secret. An empty secret
/// signs nothing and yields an empty string.
pub fn sign(secret: &str, body: &[u8]) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Hex HMAC-SHA1 for the legacy `X-Hub-Signature` header. Empty for an
/// empty secret, like [`sign`].
pub fn sign_sha1(secret: &str, body: &[u8]) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks an `X-Hub-Signature` or `X-Hub-Signature-256` value the way a
/// receiver would.
#[cfg(test)]
pub(crate) fn verify_hub_signature(secret: &str, body: &[u8], header: &str) -> bool {
    let (algorithm, signature) = header.split_once('=').unwrap_or_default();
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    match algorithm {
        "sha256" => HmacSha256::new_from_slice(secret.as_bytes())
            .map(|mut mac| {
                mac.update(body);
                mac.verify_slice(&expected).is_ok()
            })
            .unwrap_or(false),
        "sha1" => HmacSha1::new_from_slice(secret.as_bytes())
            .map(|mut mac| {
                mac.update(body);
                mac.verify_slice(&expected).is_ok()
            })
            .unwrap_or(false),
        _ => false,
    }
}
