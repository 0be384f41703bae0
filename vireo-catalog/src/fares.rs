use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vireo_shared::PassengerType;

/// Flat base fares by booking class, minor units. Not inventory-sensitive.
fn base_fare_minor(booking_class: char) -> Option<i64> {
    match booking_class {
        'J' => Some(92_000),
        'C' => Some(78_000),
        'D' => Some(61_000),
        'Y' => Some(26_000),
        'B' => Some(21_000),
        'M' => Some(17_500),
        'K' => Some(12_900),
        _ => None,
    }
}

/// Static conversion multipliers from the pricing base currency.
fn currency_multiplier(currency: &str) -> Option<f64> {
    match currency {
        "USD" => Some(1.0),
        "GBP" => Some(0.78),
        "EUR" => Some(0.92),
        "CAD" => Some(1.36),
        "AUD" => Some(1.52),
        _ => None,
    }
}

fn passenger_multiplier(passenger_type: PassengerType) -> f64 {
    match passenger_type {
        PassengerType::Adult => 1.0,
        PassengerType::Child => 0.75,
        PassengerType::Infant => 0.10,
    }
}

/// A named price-point template: multiplier over the base plus fixed
/// benefit flags.
#[derive(Debug, Clone, Copy)]
pub struct FareFamily {
    pub code: &'static str,
    pub name: &'static str,
    pub multiplier: f64,
    pub refundable: bool,
    pub changeable: bool,
    pub change_fee_minor: i64,
    pub checked_bags: u8,
}

pub const FARE_FAMILIES: &[FareFamily] = &[
    FareFamily {
        code: "LITE",
        name: "Vireo Lite",
        multiplier: 1.0,
        refundable: false,
        changeable: false,
        change_fee_minor: 0,
        checked_bags: 0,
    },
    FareFamily {
        code: "CLASSIC",
        name: "Vireo Classic",
        multiplier: 1.25,
        refundable: false,
        changeable: true,
        change_fee_minor: 7_500,
        checked_bags: 1,
    },
    FareFamily {
        code: "FLEX",
        name: "Vireo Flex",
        multiplier: 1.6,
        refundable: true,
        changeable: true,
        change_fee_minor: 0,
        checked_bags: 2,
    },
];

/// One priced fare-family option inside a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareOption {
    pub family: String,
    pub name: String,
    pub total_minor: i64,
    pub refundable: bool,
    pub changeable: bool,
    pub change_fee_minor: i64,
    pub checked_bags: u8,
}

/// Per-passenger fare record on a booking. A quote until `is_stored` flips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    pub passenger_id: u32,
    pub passenger_type: PassengerType,
    pub currency: String,
    pub base_minor: i64,
    pub options: Vec<FareOption>,
    pub selected: Option<FareOption>,
    pub restriction: Option<String>,
    pub is_stored: bool,
    pub quoted_at: DateTime<Utc>,
}

impl FareQuote {
    pub fn stored_total_minor(&self) -> Option<i64> {
        if !self.is_stored {
            return None;
        }
        self.selected.as_ref().map(|option| option.total_minor)
    }
}

/// How a stored fare is chosen from the quoted options.
#[derive(Debug, Clone)]
pub enum FareSelection {
    /// Cheapest option for everyone.
    Cheapest,
    /// One family code for everyone.
    Family(String),
    /// A family code per passenger type; unlisted types fall back to cheapest.
    PerType(HashMap<PassengerType, String>),
}

#[derive(Debug, thiserror::Error)]
pub enum FareError {
    #[error("No published fare for class {0}")]
    UnknownClass(char),

    #[error("Currency {0} is not supported")]
    UnknownCurrency(String),

    #[error("No air segments to price")]
    NothingToPrice,

    #[error("No fare family {0}")]
    UnknownFamily(String),

    #[error("Fare has no options to store")]
    EmptyQuote,
}

/// Pure pricing: booking classes + currency in, one option per fare family
/// out. No shared state.
pub struct FareEngine;

impl FareEngine {
    pub fn quote(
        &self,
        passenger_id: u32,
        passenger_type: PassengerType,
        booking_classes: &[char],
        currency: &str,
    ) -> Result<FareQuote, FareError> {
        if booking_classes.is_empty() {
            return Err(FareError::NothingToPrice);
        }
        let fx = currency_multiplier(currency)
            .ok_or_else(|| FareError::UnknownCurrency(currency.to_string()))?;

        let mut base = 0i64;
        for &class in booking_classes {
            base += base_fare_minor(class).ok_or(FareError::UnknownClass(class))?;
        }
        let base = (base as f64 * fx * passenger_multiplier(passenger_type)).round() as i64;

        let options = FARE_FAMILIES
            .iter()
            .map(|family| FareOption {
                family: family.code.to_string(),
                name: family.name.to_string(),
                total_minor: (base as f64 * family.multiplier).round() as i64,
                refundable: family.refundable,
                changeable: family.changeable,
                change_fee_minor: (family.change_fee_minor as f64 * fx).round() as i64,
                checked_bags: family.checked_bags,
            })
            .collect();

        Ok(FareQuote {
            passenger_id,
            passenger_type,
            currency: currency.to_string(),
            base_minor: base,
            options,
            selected: None,
            restriction: None,
            is_stored: false,
            quoted_at: Utc::now(),
        })
    }

    /// Lock exactly one option into the quote and flip `is_stored`.
    pub fn store_selection(
        &self,
        quote: &mut FareQuote,
        selection: &FareSelection,
    ) -> Result<(), FareError> {
        if quote.options.is_empty() {
            return Err(FareError::EmptyQuote);
        }

        let family = match selection {
            FareSelection::Cheapest => None,
            FareSelection::Family(code) => Some(code.clone()),
            FareSelection::PerType(by_type) => by_type.get(&quote.passenger_type).cloned(),
        };

        let chosen = match family {
            Some(code) => quote
                .options
                .iter()
                .find(|option| option.family == code)
                .ok_or(FareError::UnknownFamily(code))?,
            None => quote
                .options
                .iter()
                .min_by_key(|option| option.total_minor)
                .ok_or(FareError::EmptyQuote)?,
        }
        .clone();

        quote.restriction = Some(Self::restriction_string(&chosen));
        quote.selected = Some(chosen);
        quote.is_stored = true;
        Ok(())
    }

    fn restriction_string(option: &FareOption) -> String {
        let mut parts = Vec::new();
        if !option.refundable {
            parts.push("NONREF".to_string());
        }
        if !option.changeable {
            parts.push("NOCHG".to_string());
        } else if option.change_fee_minor > 0 {
            parts.push(format!("CHGFEE{}", option.change_fee_minor / 100));
        }
        if option.checked_bags == 0 {
            parts.push("NOBAG".to_string());
        } else {
            parts.push(format!("BAG{}", option.checked_bags));
        }
        if parts.is_empty() {
            "NIL".to_string()
        } else {
            parts.join("/")
        }
    }
}
