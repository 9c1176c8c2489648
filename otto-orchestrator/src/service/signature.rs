//! GitHub webhook signatures
//!
//! `X-Hub-Signature-256` carries `sha256=` followed by the hex HMAC-SHA256 of
//! the raw request body, keyed with the webhook secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "sha256=";

/// Checks a signature header against the body.
///
/// The comparison is constant time.
pub fn verify(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.trim().strip_prefix(PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Header value GitHub would send for `body`
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{}{}", PREFIX, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // Example from GitHub's webhook documentation
        let signature = sign("It's a Secret to Everybody", b"Hello, World!");
        assert_eq!(
            signature,
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn test_verify() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("secret", body);

        assert!(verify("secret", body, &header));
        assert!(!verify("other", body, &header));
        assert!(!verify("secret", b"tampered", &header));
        assert!(!verify("secret", body, header.trim_start_matches(PREFIX)));
        assert!(!verify("secret", body, "sha256=zz"));
    }
}
