use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::OAuthError;

const STATE_BYTES: usize = 32;
const NONCE_BYTES: usize = 24;

/// Random CSRF token for the `state` parameter (43 url-safe characters).
pub fn generate_state() -> Result<String, OAuthError> {
    random_token::<STATE_BYTES>()
}

/// Single-use replay protection value for the `nonce` parameter
/// (32 url-safe characters).
pub fn generate_nonce() -> Result<String, OAuthError> {
    random_token::<NONCE_BYTES>()
}

fn random_token<const N: usize>() -> Result<String, OAuthError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| OAuthError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{generate_nonce, generate_state};

    #[test]
    fn tokens_are_url_safe() {
        for value in [generate_state().unwrap(), generate_nonce().unwrap()] {
            assert!(!value.contains('='), "tokens should be unpadded");
            assert!(!value.contains('+'), "tokens should be url safe");
            assert!(!value.contains('/'), "tokens should be url safe");
        }
    }

    #[test]
    fn nonces_are_long_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let nonce = generate_nonce().unwrap();
            assert!(nonce.len() >= 20);
            assert!(seen.insert(nonce), "nonce collision");
        }
    }

    #[test]
    fn state_has_expected_length() {
        assert_eq!(generate_state().unwrap().len(), 43);
    }
}
