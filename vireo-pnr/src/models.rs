use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vireo_catalog::fares::FareQuote;
use vireo_catalog::FlightDate;
use vireo_core::payment::CardDetails;
use vireo_shared::{Masked, PassengerType};

/// Booking status in the lifecycle. Forward-only, except rollback on
/// deletion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PnrStatus {
    Pending,
    Confirmed,
    Ticketed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentStatus {
    Holding,
    Confirmed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Open,
    CheckedIn,
    Used,
    Lifted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Passport,
    IdentityCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelDocument {
    pub document_type: DocumentType,
    pub number: Masked<String>,
    pub nationality: String,
    pub issuing_country: String,
    pub date_of_birth: NaiveDate,
    pub expiry: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    /// 1-based sequence id, stable once assigned.
    pub id: u32,
    pub surname: String,
    pub given_name: String,
    pub title: Option<String>,
    pub passenger_type: PassengerType,
    pub documents: Vec<TravelDocument>,
}

impl Passenger {
    /// "SURNAME/GIVENNAME" display form used on tickets and passes.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.surname, self.given_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirSegment {
    /// 1-based sequence number, stable once assigned.
    pub number: u32,
    pub flight_number: String,
    pub aircraft_type: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub booking_class: char,
    pub quantity: u32,
    pub status: SegmentStatus,
}

impl AirSegment {
    pub fn flight_date(&self) -> FlightDate {
        FlightDate::new(self.flight_number.clone(), self.departure.date_naive())
    }
}

/// ARNK placeholder for a gap the passenger covers on the ground.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSegment {
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    Air(AirSegment),
    Surface(SurfaceSegment),
}

impl Segment {
    pub fn number(&self) -> u32 {
        match self {
            Segment::Air(air) => air.number,
            Segment::Surface(surface) => surface.number,
        }
    }

    pub fn as_air(&self) -> Option<&AirSegment> {
        match self {
            Segment::Air(air) => Some(air),
            Segment::Surface(_) => None,
        }
    }

    pub fn is_air(&self) -> bool {
        matches!(self, Segment::Air(_))
    }
}

/// One flown-segment's worth of a ticket's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    /// 1-based position within the ticket.
    pub number: u32,
    pub segment_number: u32,
    pub fare_minor: i64,
    pub status: CouponStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub number: String,
    pub passenger_id: u32,
    pub coupons: Vec<Coupon>,
    pub total_minor: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

impl Ticket {
    pub fn coupon_for_segment(&self, segment_number: u32) -> Option<&Coupon> {
        self.coupons
            .iter()
            .find(|coupon| coupon.segment_number == segment_number)
    }

    pub fn coupon_for_segment_mut(&mut self, segment_number: u32) -> Option<&mut Coupon> {
        self.coupons
            .iter_mut()
            .find(|coupon| coupon.segment_number == segment_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub passenger_id: u32,
    pub segment_number: u32,
    pub seat: String,
}

/// Special Service Request: passenger-level annotation. DOCS and DOCA are
/// machine-interpreted at check-in; everything else is free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ssr {
    pub code: String,
    pub passenger_id: u32,
    pub text: String,
}

/// Other Service Information: free-text operational annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Osi {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormOfPayment {
    Cash,
    Card(CardDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingArrangement {
    pub time_limit: DateTime<Utc>,
    pub validating_carrier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub iata_code: String,
    pub office_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none()
    }
}

/// The booking aggregate: the unit of transactional ownership. Mutated in
/// place by workspace operations, durable only after commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pnr {
    pub id: Uuid,
    /// Assigned at first successful commit, immutable thereafter.
    pub locator: Option<String>,
    pub status: PnrStatus,
    /// Session holding the uncommitted working copy. The concurrency
    /// boundary, not a hard lock; cleared once committed.
    pub session_id: Option<String>,
    pub session_opened_at: Option<DateTime<Utc>>,
    pub passengers: Vec<Passenger>,
    pub segments: Vec<Segment>,
    pub fares: Vec<FareQuote>,
    pub tickets: Vec<Ticket>,
    pub seat_assignments: Vec<SeatAssignment>,
    pub ssrs: Vec<Ssr>,
    pub osis: Vec<Osi>,
    pub form_of_payment: Option<FormOfPayment>,
    pub ticketing: Option<TicketingArrangement>,
    pub agency: Option<Agency>,
    pub contact: Option<Contact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pnr {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            locator: None,
            status: PnrStatus::Pending,
            session_id: Some(session_id.into()),
            session_opened_at: Some(now),
            passengers: Vec::new(),
            segments: Vec::new(),
            fares: Vec::new(),
            tickets: Vec::new(),
            seat_assignments: Vec::new(),
            ssrs: Vec::new(),
            osis: Vec::new(),
            form_of_payment: None,
            ticketing: None,
            agency: None,
            contact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn next_passenger_id(&self) -> u32 {
        self.passengers.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    pub fn next_segment_number(&self) -> u32 {
        self.segments.iter().map(|s| s.number()).max().unwrap_or(0) + 1
    }

    pub fn passenger(&self, id: u32) -> Option<&Passenger> {
        self.passengers.iter().find(|p| p.id == id)
    }

    pub fn passenger_mut(&mut self, id: u32) -> Option<&mut Passenger> {
        self.passengers.iter_mut().find(|p| p.id == id)
    }

    pub fn segment(&self, number: u32) -> Option<&Segment> {
        self.segments.iter().find(|s| s.number() == number)
    }

    pub fn air_segment(&self, number: u32) -> Option<&AirSegment> {
        self.segment(number).and_then(Segment::as_air)
    }

    pub fn air_segments(&self) -> impl Iterator<Item = &AirSegment> {
        self.segments.iter().filter_map(Segment::as_air)
    }

    pub fn seat_for(&self, passenger_id: u32, segment_number: u32) -> Option<&SeatAssignment> {
        self.seat_assignments
            .iter()
            .find(|sa| sa.passenger_id == passenger_id && sa.segment_number == segment_number)
    }

    pub fn ticket_for(&self, passenger_id: u32) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.passenger_id == passenger_id)
    }

    pub fn ticket_for_mut(&mut self, passenger_id: u32) -> Option<&mut Ticket> {
        self.tickets
            .iter_mut()
            .find(|t| t.passenger_id == passenger_id)
    }

    pub fn fare_for(&self, passenger_id: u32) -> Option<&FareQuote> {
        self.fares.iter().find(|f| f.passenger_id == passenger_id)
    }

    pub fn has_stored_fare(&self) -> bool {
        self.fares.iter().any(|f| f.is_stored)
    }

    pub fn ssrs_for(&self, passenger_id: u32) -> impl Iterator<Item = &Ssr> {
        self.ssrs.iter().filter(move |s| s.passenger_id == passenger_id)
    }

    pub fn add_osi(&mut self, text: impl Into<String>) {
        self.osis.push(Osi {
            text: text.into(),
            created_at: Utc::now(),
        });
        self.touch();
    }
}
