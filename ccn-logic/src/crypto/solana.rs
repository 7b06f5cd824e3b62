use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};

use crate::errors::VerifyError;

use super::SignatureScheme;

/// Ed25519 signature over the canonical item content bytes, `sender` decoded
/// as a base58 Solana public key.
pub struct SolanaScheme;

impl SignatureScheme for SolanaScheme {
    fn verify(&self, item_content: &[u8], signature: &str, sender: &str) -> Result<(), VerifyError> {
        let sig_bytes = bs58::decode(signature)
            .into_vec()
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
        let sig_bytes: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| VerifyError::MalformedSignature("expected 64-byte signature".into()))?;
        let signature = Ed25519Signature::from_bytes(&sig_bytes);

        let pubkey_bytes = bs58::decode(sender)
            .into_vec()
            .map_err(|e| VerifyError::MalformedSender(e.to_string()))?;
        let pubkey_bytes: [u8; 32] = pubkey_bytes
            .try_into()
            .map_err(|_| VerifyError::MalformedSender("expected 32-byte public key".into()))?;
        let verifying_key = VerifyingKey::from_bytes(&pubkey_bytes)
            .map_err(|e| VerifyError::MalformedSender(e.to_string()))?;

        verifying_key
            .verify(item_content, &signature)
            .map_err(|_| VerifyError::Mismatch)
    }
}
