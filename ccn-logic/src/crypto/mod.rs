//! Per-chain signature verification (spec §4.4 step 3).
//!
//! Dispatch mirrors `Signature::verify`'s match on `Address::protocol()` in
//! `forest_crypto`: one `SignatureScheme` per chain family, picked by the
//! candidate's `chain` field.

mod ethereum;
mod solana;

pub use ethereum::EthereumScheme;
pub use solana::SolanaScheme;

use ccn_entity::sea_orm_active_enums::Chain;

use crate::errors::VerifyError;

/// Verifies that `signature` over `item_content` was produced by `sender`,
/// where both are opaque strings in the scheme's own encoding (a `0x`-prefixed
/// hex address for Ethereum, a base58 public key for Solana).
pub trait SignatureScheme: Send + Sync {
    fn verify(&self, item_content: &[u8], signature: &str, sender: &str) -> Result<(), VerifyError>;
}

/// Picks the verification scheme for `chain`. `Tezos`/`Bsc` share no scheme of
/// their own in this core: Tezos messages only ever arrive via the
/// smart-contract protocol (`check_message = false`, never reaching here) and
/// Bsc is EVM-compatible, so it reuses `EthereumScheme`.
pub fn scheme_for(chain: &Chain) -> Result<Box<dyn SignatureScheme>, VerifyError> {
    match chain {
        Chain::Ethereum | Chain::Bsc => Ok(Box::new(EthereumScheme)),
        Chain::Solana => Ok(Box::new(SolanaScheme)),
        Chain::Tezos => Err(VerifyError::UnsupportedChain(chain.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tezos_has_no_scheme() {
        assert!(scheme_for(&Chain::Ethereum).is_ok());
        assert!(scheme_for(&Chain::Bsc).is_ok());
        assert!(scheme_for(&Chain::Solana).is_ok());
        assert!(scheme_for(&Chain::Tezos).is_err());
    }
}
