//! Quote request values and fingerprinting
//!
//! A request is immutable once built; user edits produce a new request
//! rather than mutating the old one. The fingerprint concatenates every
//! field and is the identity used for change detection and staleness
//! checks.

use serde_json::json;

/// Parameters of one live quote subscription
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    /// Address authorizing the eventual transaction
    pub signer: String,
    /// Input asset mint
    pub input_mint: String,
    /// Output asset mint
    pub output_mint: String,
    /// Input amount in UI units, strictly positive
    pub amount: f64,
    /// Slippage tolerance, percent
    pub slippage_pct: f64,
    /// Priority fee, SOL
    pub priority_fee_sol: f64,
}

impl QuoteRequest {
    /// Build a request from raw UI inputs. Returns `None` — the
    /// "no request" sentinel — when a token is missing, the amount is
    /// not positive, the signer or a mint is not a plausible base58
    /// address, or the amount exceeds the available balance.
    #[allow(clippy::too_many_arguments)]
    pub fn from_inputs(
        signer: &str,
        input_mint: Option<&str>,
        output_mint: Option<&str>,
        amount: f64,
        slippage_pct: f64,
        priority_fee_sol: f64,
        available: Option<f64>,
    ) -> Option<Self> {
        let input_mint = input_mint?;
        let output_mint = output_mint?;
        if !is_base58(signer) || !is_base58(input_mint) || !is_base58(output_mint) {
            return None;
        }
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        if let Some(available) = available {
            if amount > available {
                return None;
            }
        }
        Some(Self {
            signer: signer.to_string(),
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount,
            slippage_pct,
            priority_fee_sol,
        })
    }

    /// Identity key: two requests with equal fingerprints must share one
    /// channel, and a delivered quote is only applied while its
    /// fingerprint is still the active one.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.signer,
            self.input_mint,
            self.output_mint,
            self.amount,
            self.slippage_pct,
            self.priority_fee_sol
        )
    }

    /// Initial subscription message sent after connecting
    pub fn subscribe_payload(&self) -> serde_json::Value {
        json!({
            "signer": self.signer,
            "x_mint": self.input_mint,
            "y_mint": self.output_mint,
            // string to preserve u128 compatibility on the remote side
            "amount": self.amount.to_string(),
            "slippage": self.slippage_pct,
            "priority_fee": self.priority_fee_sol,
        })
    }
}

fn is_base58(s: &str) -> bool {
    !s.is_empty() && bs58::decode(s).into_vec().is_ok()
}

/// A quote delivered to the orchestration layer
#[derive(Debug, Clone)]
pub struct QuoteUpdate {
    /// Fingerprint of the request this quote answers
    pub fingerprint: String,
    /// Expected output amount in UI units
    pub expected_out: f64,
    /// Unsigned transaction payload, base64
    pub transaction: Option<String>,
    /// Companion relay transaction, base64
    pub arb_transaction: Option<String>,
}
