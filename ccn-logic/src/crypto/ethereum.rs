use libsecp256k1::{recover, Message, RecoveryId, Signature as Secp256k1Signature};
use sha3::{Digest, Keccak256};

use crate::errors::VerifyError;

use super::SignatureScheme;

/// `personal_sign`-style Ethereum signature: `keccak256` over the canonical
/// item content bytes, then ECDSA recovery against the sender's address.
pub struct EthereumScheme;

impl SignatureScheme for EthereumScheme {
    fn verify(&self, item_content: &[u8], signature: &str, sender: &str) -> Result<(), VerifyError> {
        let sig_bytes = decode_hex(signature)
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
        if sig_bytes.len() != 65 {
            return Err(VerifyError::MalformedSignature(format!(
                "expected 65-byte recoverable signature, got {}",
                sig_bytes.len()
            )));
        }

        let recovery_id = RecoveryId::parse(normalize_recovery_byte(sig_bytes[64]))
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
        let signature = Secp256k1Signature::parse_standard_slice(&sig_bytes[..64])
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;

        let hash = keccak256(item_content);
        let message = Message::parse(&hash);

        let public_key = recover(&message, &signature, &recovery_id)
            .map_err(|e| VerifyError::MalformedSignature(e.to_string()))?;
        let recovered_address = address_from_public_key(&public_key);

        let expected = decode_hex(sender.trim_start_matches("0x"))
            .map_err(|e| VerifyError::MalformedSender(e.to_string()))?;
        if expected.len() != 20 {
            return Err(VerifyError::MalformedSender(format!(
                "expected 20-byte address, got {} bytes",
                expected.len()
            )));
        }

        if recovered_address == expected.as_slice() {
            Ok(())
        } else {
            Err(VerifyError::Mismatch)
        }
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn address_from_public_key(public_key: &libsecp256k1::PublicKey) -> [u8; 20] {
    let uncompressed = public_key.serialize();
    // Skip the 0x04 prefix byte; the address is the last 20 bytes of
    // keccak256(x || y).
    let hash = keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

fn normalize_recovery_byte(byte: u8) -> u8 {
    if byte >= 27 {
        byte - 27
    } else {
        byte
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.trim_start_matches("0x"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_signatures() {
        let err = EthereumScheme
            .verify(b"content", "0xdead", "0x0000000000000000000000000000000000dead")
            .unwrap_err();
        assert!(matches!(err, VerifyError::MalformedSignature(_)));
    }
}
