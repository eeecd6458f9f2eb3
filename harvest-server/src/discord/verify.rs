//! Interaction request signatures
//!
//! Every interaction POST carries `X-Signature-Ed25519` (hex) over
//! `X-Signature-Timestamp` followed by the raw body.

use ring::signature::{self, UnparsedPublicKey};
use shared::error::{AppError, ErrorCode};

const PUBLIC_KEY_LEN: usize = 32;

/// Signed requests older or newer than this are refused as replays
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

pub struct InteractionVerifier {
    public_key: UnparsedPublicKey<Vec<u8>>,
}

impl InteractionVerifier {
    /// Build from the application's hex-encoded public key
    pub fn from_hex(public_key_hex: &str) -> Result<Self, AppError> {
        let bytes = hex::decode(public_key_hex.trim()).map_err(|e| {
            AppError::with_message(
                ErrorCode::ConfigError,
                format!("DISCORD_PUBLIC_KEY is not valid hex: {e}"),
            )
        })?;
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                format!(
                    "DISCORD_PUBLIC_KEY must be {PUBLIC_KEY_LEN} bytes, got {}",
                    bytes.len()
                ),
            ));
        }
        Ok(Self {
            public_key: UnparsedPublicKey::new(&signature::ED25519, bytes),
        })
    }

    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> Result<(), AppError> {
        let invalid = || AppError::new(ErrorCode::SignatureInvalid);

        let sig = hex::decode(signature_hex.trim()).map_err(|_| invalid())?;
        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.public_key
            .verify(&message, &sig)
            .map_err(|_| invalid())
    }
}

/// Reject timestamps that are not unix seconds within the allowed skew of `now_secs`
pub fn check_timestamp(timestamp: &str, now_secs: i64) -> Result<(), AppError> {
    let sent: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| AppError::new(ErrorCode::SignatureInvalid))?;
    if (now_secs - sent).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(AppError::with_message(
            ErrorCode::SignatureInvalid,
            "Interaction timestamp is outside the accepted window",
        ));
    }
    Ok(())
}

impl std::fmt::Debug for InteractionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionVerifier").finish_non_exhaustive()
    }
}
