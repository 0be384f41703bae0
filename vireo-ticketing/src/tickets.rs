use std::sync::Arc;
use vireo_core::sequence::TicketSequence;

/// Synthesizes ticket numbers: airline numeric prefix, a ten digit
/// sequence from the injected source, and a mod-10 check digit.
pub struct TicketNumberGenerator {
    prefix: String,
    sequence: Arc<dyn TicketSequence>,
}

impl TicketNumberGenerator {
    pub fn new(prefix: impl Into<String>, sequence: Arc<dyn TicketSequence>) -> Self {
        Self {
            prefix: prefix.into(),
            sequence,
        }
    }

    pub fn next_number(&self) -> String {
        let body = format!("{}{:010}", self.prefix, self.sequence.next());
        format!("{}{}", body, luhn_check_digit(&body))
    }
}

/// Check digit that makes the full number pass the Luhn test: doubling
/// alternate digits from the right of the payload, folding two digit
/// products.
pub fn luhn_check_digit(payload: &str) -> u32 {
    let sum: u32 = payload
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

/// Standard Luhn verification over a full number including its check digit.
pub fn is_valid_ticket_number(number: &str) -> bool {
    if number.len() < 2 || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = number
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
