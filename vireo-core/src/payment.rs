use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vireo_shared::Masked;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl CardType {
    pub fn code(&self) -> &'static str {
        match self {
            CardType::Visa => "VI",
            CardType::Mastercard => "CA",
            CardType::Amex => "AX",
            CardType::Discover => "DS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_type: CardType,
    pub number: Masked<String>,
    /// MMYY
    pub expiry: String,
}

/// Gateway verdict on an authorization request. A decline is an expected
/// outcome, not an error; `PaymentError` is reserved for channel failures.
#[derive(Debug, Clone)]
pub struct AuthorizationOutcome {
    pub approved: bool,
    pub auth_code: Option<String>,
    pub transaction_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub approved: bool,
    pub capture_code: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment gateway unreachable: {0}")]
    Unavailable(String),

    #[error("Malformed gateway response: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Place an authorization hold for the given amount (minor units).
    async fn authorize(
        &self,
        card: &CardDetails,
        amount_minor: i64,
        currency: &str,
        reference: &str,
    ) -> Result<AuthorizationOutcome, PaymentError>;

    /// Capture a previously authorized amount.
    async fn capture(
        &self,
        auth_code: &str,
        amount_minor: i64,
        currency: &str,
        reference: &str,
    ) -> Result<CaptureOutcome, PaymentError>;

    /// Release an authorization hold. Returns whether the acquirer honoured
    /// the reversal.
    async fn reverse_authorization(
        &self,
        auth_code: &str,
        reference: &str,
    ) -> Result<bool, PaymentError>;
}
