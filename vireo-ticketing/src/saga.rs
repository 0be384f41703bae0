use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use vireo_core::payment::{
    AuthorizationOutcome, CaptureOutcome, CardDetails, PaymentError, PaymentGateway,
};
use vireo_pnr::models::{Coupon, CouponStatus, FormOfPayment, Pnr, PnrStatus, Ticket};

use crate::tickets::TicketNumberGenerator;

/// Hard ticketing limit: a ticket carries at most four flight coupons.
pub const MAX_TICKETED_SEGMENTS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    #[error("No stored fare on the booking")]
    NoStoredFare,

    #[error("No form of payment on the booking")]
    NoFormOfPayment,

    #[error("{0} air segments exceed the four coupon ticketing limit")]
    TooManySegments(usize),

    #[error("Booking is already ticketed")]
    AlreadyTicketed,

    #[error("Fare currencies disagree across passengers")]
    MixedCurrencies,

    #[error("Payment declined: {0}")]
    AuthorizationDeclined(String),

    #[error("Payment capture failed: {0}")]
    CaptureFailed(String),

    #[error(transparent)]
    Gateway(#[from] PaymentError),
}

/// Turns a priced, paid-for booking into tickets. The step sequence is
/// authorize, build, capture, record; the compensation action is keyed on
/// whether an authorization hold exists, and runs on any later failure. A
/// failed reversal is logged but never masks the original error. No
/// partially-ticketed booking survives any path out of here.
pub struct TicketingSaga {
    gateway: Arc<dyn PaymentGateway>,
    numbers: TicketNumberGenerator,
}

impl TicketingSaga {
    pub fn new(gateway: Arc<dyn PaymentGateway>, numbers: TicketNumberGenerator) -> Self {
        Self { gateway, numbers }
    }

    pub async fn issue(&self, pnr: &mut Pnr) -> Result<Vec<Ticket>, TicketingError> {
        if pnr.status == PnrStatus::Ticketed {
            return Err(TicketingError::AlreadyTicketed);
        }
        let stored: Vec<_> = pnr.fares.iter().filter(|f| f.is_stored).collect();
        if stored.is_empty() {
            return Err(TicketingError::NoStoredFare);
        }
        let Some(fop) = pnr.form_of_payment.clone() else {
            return Err(TicketingError::NoFormOfPayment);
        };
        let air_count = pnr.air_segments().count();
        if air_count > MAX_TICKETED_SEGMENTS {
            return Err(TicketingError::TooManySegments(air_count));
        }

        let currency = stored[0].currency.clone();
        if stored.iter().any(|f| f.currency != currency) {
            return Err(TicketingError::MixedCurrencies);
        }
        let total: i64 = stored
            .iter()
            .filter_map(|f| f.stored_total_minor())
            .sum();
        let reference = pnr
            .locator
            .clone()
            .unwrap_or_else(|| pnr.id.to_string());

        // Step 1: authorize. A decline aborts with no state change and
        // nothing to compensate.
        let auth_code = match &fop {
            FormOfPayment::Cash => None,
            FormOfPayment::Card(card) => {
                Some(self.authorize(card, total, &currency, &reference).await?)
            }
        };

        // Steps 2-4 run under the compensation guard: any failure after a
        // successful authorization triggers a reversal attempt.
        let outcome = self
            .issue_inner(pnr, total, &currency, auth_code.as_deref(), &reference)
            .await;

        match outcome {
            Ok(tickets) => Ok(tickets),
            Err(err) => {
                if let Some(code) = auth_code {
                    self.compensate(&code, &reference).await;
                }
                Err(err)
            }
        }
    }

    async fn authorize(
        &self,
        card: &CardDetails,
        total: i64,
        currency: &str,
        reference: &str,
    ) -> Result<String, TicketingError> {
        let AuthorizationOutcome {
            approved,
            auth_code,
            transaction_id,
            reason,
        } = self
            .gateway
            .authorize(card, total, currency, reference)
            .await?;

        if !approved {
            return Err(TicketingError::AuthorizationDeclined(
                reason.unwrap_or_else(|| "declined".to_string()),
            ));
        }
        tracing::info!(reference, ?transaction_id, "payment authorized");
        auth_code.ok_or(TicketingError::Gateway(PaymentError::Protocol(
            "approved authorization carried no auth code".to_string(),
        )))
    }

    async fn issue_inner(
        &self,
        pnr: &mut Pnr,
        total: i64,
        currency: &str,
        auth_code: Option<&str>,
        reference: &str,
    ) -> Result<Vec<Ticket>, TicketingError> {
        // Step 2: build tickets locally. Nothing is attached to the
        // booking until capture has gone through.
        let air_numbers: Vec<u32> = pnr.air_segments().map(|a| a.number).collect();
        let mut tickets = Vec::new();
        for fare in pnr.fares.iter().filter(|f| f.is_stored) {
            let Some(fare_total) = fare.stored_total_minor() else {
                continue;
            };
            tickets.push(Ticket {
                number: self.numbers.next_number(),
                passenger_id: fare.passenger_id,
                coupons: split_coupons(fare_total, &air_numbers),
                total_minor: fare_total,
                currency: currency.to_string(),
                issued_at: Utc::now(),
            });
        }

        // Step 3: capture. On failure the freshly built tickets are
        // dropped on the floor and the caller compensates.
        if let Some(code) = auth_code {
            let CaptureOutcome {
                approved, reason, ..
            } = self
                .gateway
                .capture(code, total, currency, reference)
                .await?;
            if !approved {
                return Err(TicketingError::CaptureFailed(
                    reason.unwrap_or_else(|| "capture refused".to_string()),
                ));
            }
        }

        // Step 4: attach and annotate.
        pnr.tickets.extend(tickets.iter().cloned());
        pnr.status = PnrStatus::Ticketed;
        let confirmation = match auth_code {
            Some(code) => format!("PAYMENT CONFIRMED {} {:.2} AUTH {}", currency, total as f64 / 100.0, code),
            None => format!("PAYMENT CONFIRMED {} {:.2} CASH", currency, total as f64 / 100.0),
        };
        pnr.add_osi(confirmation);
        tracing::info!(reference, tickets = tickets.len(), "ticketing complete");
        Ok(tickets)
    }

    async fn compensate(&self, auth_code: &str, reference: &str) {
        match self.gateway.reverse_authorization(auth_code, reference).await {
            Ok(true) => tracing::info!(reference, "authorization reversed"),
            Ok(false) => tracing::warn!(reference, "acquirer refused the reversal"),
            Err(err) => {
                // The reversal failure must not mask the original error:
                // report it here and let the original surface.
                tracing::warn!(reference, error = %err, "reversal attempt failed");
            }
        }
    }
}

/// Splits a fare total evenly across the flight coupons by index; the
/// remainder lands on the earliest coupons.
fn split_coupons(fare_total: i64, air_numbers: &[u32]) -> Vec<Coupon> {
    let n = air_numbers.len() as i64;
    if n == 0 {
        return Vec::new();
    }
    let share = fare_total / n;
    let remainder = fare_total - share * n;

    air_numbers
        .iter()
        .enumerate()
        .map(|(i, &segment_number)| Coupon {
            number: i as u32 + 1,
            segment_number,
            fare_minor: share + if (i as i64) < remainder { 1 } else { 0 },
            status: CouponStatus::Open,
        })
        .collect()
}

/// Scriptable gateway standing in for the acquirer. Records every call so
/// tests can assert on the compensation path.
pub struct MockGateway {
    pub decline_authorization: bool,
    pub fail_capture: bool,
    pub authorizations: Mutex<Vec<String>>,
    pub captures: Mutex<Vec<String>>,
    pub reversals: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn approving() -> Self {
        Self {
            decline_authorization: false,
            fail_capture: false,
            authorizations: Mutex::new(Vec::new()),
            captures: Mutex::new(Vec::new()),
            reversals: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            decline_authorization: true,
            ..Self::approving()
        }
    }

    pub fn failing_capture() -> Self {
        Self {
            fail_capture: true,
            ..Self::approving()
        }
    }

    pub fn reversal_count(&self) -> usize {
        self.reversals.lock().expect("gateway lock poisoned").len()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn authorize(
        &self,
        _card: &CardDetails,
        _amount_minor: i64,
        _currency: &str,
        reference: &str,
    ) -> Result<AuthorizationOutcome, PaymentError> {
        self.authorizations
            .lock()
            .expect("gateway lock poisoned")
            .push(reference.to_string());

        if self.decline_authorization {
            return Ok(AuthorizationOutcome {
                approved: false,
                auth_code: None,
                transaction_id: None,
                reason: Some("INSUFFICIENT FUNDS".to_string()),
            });
        }
        Ok(AuthorizationOutcome {
            approved: true,
            auth_code: Some(format!("AUTH-{reference}")),
            transaction_id: Some(format!("TXN-{reference}")),
            reason: None,
        })
    }

    async fn capture(
        &self,
        auth_code: &str,
        _amount_minor: i64,
        _currency: &str,
        _reference: &str,
    ) -> Result<CaptureOutcome, PaymentError> {
        self.captures
            .lock()
            .expect("gateway lock poisoned")
            .push(auth_code.to_string());

        if self.fail_capture {
            return Ok(CaptureOutcome {
                approved: false,
                capture_code: None,
                reason: Some("ACQUIRER TIMEOUT".to_string()),
            });
        }
        Ok(CaptureOutcome {
            approved: true,
            capture_code: Some(format!("CAP-{auth_code}")),
            reason: None,
        })
    }

    async fn reverse_authorization(
        &self,
        auth_code: &str,
        _reference: &str,
    ) -> Result<bool, PaymentError> {
        self.reversals
            .lock()
            .expect("gateway lock poisoned")
            .push(auth_code.to_string());
        Ok(true)
    }
}
