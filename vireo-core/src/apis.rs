use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use vireo_shared::Masked;

/// Regulatory passenger data for an international departure, assembled from
/// the booking's travel documents and DOCA address annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApisRecord {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub passenger: ApisPassenger,
    pub destination_address: ApisAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApisPassenger {
    pub surname: String,
    pub given_name: String,
    pub nationality: String,
    pub date_of_birth: NaiveDate,
    pub document_number: Masked<String>,
    pub document_expiry: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApisAddress {
    pub country: String,
    pub line: String,
    pub city: String,
    pub postal_code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApisError {
    #[error("Travel document expired on {0}")]
    DocumentExpired(NaiveDate),

    #[error("Travel document expires {0}, inside the six month validity floor")]
    DocumentExpiringSoon(NaiveDate),

    #[error("Destination address incomplete: missing {0}")]
    IncompleteAddress(&'static str),

    #[error("APIS rejected the submission: {0}")]
    Rejected(String),

    #[error("APIS channel failure: {0}")]
    Channel(String),
}

#[async_trait]
pub trait ApisAdapter: Send + Sync {
    /// Structural validation of the record. Errors on expired or
    /// short-validity documents and incomplete addresses.
    async fn validate(&self, record: &ApisRecord) -> Result<bool, ApisError>;

    /// Transmit the record to the destination authority.
    async fn submit(&self, record: &ApisRecord) -> Result<bool, ApisError>;
}

/// Adapter that performs the structural checks locally and accepts every
/// well-formed record. Stands in for the government channel in tests and
/// single-node deployments.
pub struct OfflineApisAdapter;

impl OfflineApisAdapter {
    fn check(record: &ApisRecord) -> Result<(), ApisError> {
        let expiry = record.passenger.document_expiry;
        if expiry < record.departure_date {
            return Err(ApisError::DocumentExpired(expiry));
        }
        let floor = record
            .departure_date
            .checked_add_months(Months::new(6))
            .unwrap_or(record.departure_date);
        if expiry < floor {
            return Err(ApisError::DocumentExpiringSoon(expiry));
        }

        let address = &record.destination_address;
        if address.country.trim().is_empty() {
            return Err(ApisError::IncompleteAddress("country"));
        }
        if address.line.trim().is_empty() {
            return Err(ApisError::IncompleteAddress("street line"));
        }
        if address.city.trim().is_empty() {
            return Err(ApisError::IncompleteAddress("city"));
        }
        Ok(())
    }
}

#[async_trait]
impl ApisAdapter for OfflineApisAdapter {
    async fn validate(&self, record: &ApisRecord) -> Result<bool, ApisError> {
        Self::check(record)?;
        Ok(true)
    }

    async fn submit(&self, record: &ApisRecord) -> Result<bool, ApisError> {
        Self::check(record)?;
        tracing::debug!(
            flight = %record.flight_number,
            destination = %record.destination,
            "APIS record accepted"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expiry: NaiveDate) -> ApisRecord {
        ApisRecord {
            flight_number: "VX101".to_string(),
            origin: "LHR".to_string(),
            destination: "JFK".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            passenger: ApisPassenger {
                surname: "CHAPMAN".to_string(),
                given_name: "LAURA".to_string(),
                nationality: "GB".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
                document_number: "P123456789".into(),
                document_expiry: expiry,
            },
            destination_address: ApisAddress {
                country: "US".to_string(),
                line: "123 MAPLE AVE".to_string(),
                city: "NEW YORK".to_string(),
                postal_code: "10001".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_record() {
        let adapter = OfflineApisAdapter;
        let rec = record(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert!(adapter.validate(&rec).await.unwrap());
        assert!(adapter.submit(&rec).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_document_inside_validity_floor() {
        let adapter = OfflineApisAdapter;
        // Expires 2 months after departure: inside the 6 month floor.
        let rec = record(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        let err = adapter.validate(&rec).await.unwrap_err();
        assert!(matches!(err, ApisError::DocumentExpiringSoon(_)));
    }

    #[tokio::test]
    async fn test_rejects_incomplete_address() {
        let adapter = OfflineApisAdapter;
        let mut rec = record(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        rec.destination_address.city.clear();
        let err = adapter.validate(&rec).await.unwrap_err();
        assert!(matches!(err, ApisError::IncompleteAddress("city")));
    }
}
