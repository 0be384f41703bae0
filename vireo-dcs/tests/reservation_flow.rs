use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use vireo_catalog::fares::FareSelection;
use vireo_catalog::{FlightDate, InventoryLedger, SeatMapCatalog};
use vireo_core::apis::{ApisError, OfflineApisAdapter};
use vireo_core::payment::{CardDetails, CardType};
use vireo_core::sequence::AtomicSequence;
use vireo_dcs::{CheckInError, CheckInOrchestrator, CheckInRequest, SeatPicker, SimpleBoardingPassIssuer};
use vireo_pnr::models::{CouponStatus, DocumentType, FormOfPayment, PnrStatus, TravelDocument};
use vireo_pnr::workspace::{NameInput, SellSegment, WorkspaceService};
use vireo_pnr::BookingStore;
use vireo_store::InMemoryBookingStore;
use vireo_shared::PassengerType;
use vireo_ticketing::{MockGateway, TicketNumberGenerator, TicketingSaga};

fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
}

fn flight() -> FlightDate {
    FlightDate::new("VX101", NaiveDate::from_ymd_opt(2026, 10, 1).unwrap())
}

struct Harness {
    ledger: Arc<InventoryLedger>,
    store: Arc<InMemoryBookingStore>,
    workspace: WorkspaceService,
    saga: TicketingSaga,
    gateway: Arc<MockGateway>,
    orchestrator: CheckInOrchestrator,
}

fn harness() -> Harness {
    let ledger = Arc::new(InventoryLedger::new(Arc::new(
        SeatMapCatalog::with_standard_fleet(),
    )));
    ledger.open_flight(flight(), "B738", &[('Y', 50), ('J', 2)]);

    let store = Arc::new(InMemoryBookingStore::new());
    let workspace = WorkspaceService::with_locator_seed(Arc::clone(&ledger), store.clone(), 23);
    let gateway = Arc::new(MockGateway::approving());
    let saga = TicketingSaga::new(
        gateway.clone(),
        TicketNumberGenerator::new("125", Arc::new(AtomicSequence::starting_at(1))),
    );
    let orchestrator = CheckInOrchestrator::new(
        Arc::clone(&ledger),
        store.clone(),
        Arc::new(OfflineApisAdapter),
        Arc::new(SimpleBoardingPassIssuer::new()),
    )
    .with_picker(SeatPicker::seeded(5));

    Harness {
        ledger,
        store,
        workspace,
        saga,
        gateway,
        orchestrator,
    }
}

fn passport(expiry_year: i32) -> TravelDocument {
    TravelDocument {
        document_type: DocumentType::Passport,
        number: "P123456789".into(),
        nationality: "GB".to_string(),
        issuing_country: "GB".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
        expiry: NaiveDate::from_ymd_opt(expiry_year, 6, 30).unwrap(),
    }
}

fn card() -> FormOfPayment {
    FormOfPayment::Card(CardDetails {
        card_type: CardType::Visa,
        number: "4111111111111111".into(),
        expiry: "1127".to_string(),
    })
}

/// Builds, commits and tickets a one-passenger LHR-JFK booking, returning
/// its locator.
async fn ticketed_booking(h: &Harness) -> String {
    let mut pnr = h.workspace.create_workspace("AGENT-07");
    let pax = h.workspace.add_passenger(
        &mut pnr,
        NameInput {
            surname: "CHAPMAN".to_string(),
            given_name: "LAURA".to_string(),
            title: Some("MRS".to_string()),
            passenger_type: PassengerType::Adult,
        },
    );
    h.workspace
        .add_document(&mut pnr, pax, passport(2032))
        .unwrap();
    h.workspace
        .add_ssr(&mut pnr, "DOCA", pax, "US/123 MAPLE AVE/NEW YORK/10001");

    h.workspace
        .sell_segment(
            &mut pnr,
            SellSegment {
                flight_number: "VX101".to_string(),
                aircraft_type: "B738".to_string(),
                origin: "LHR".to_string(),
                destination: "JFK".to_string(),
                departure: departure(),
                arrival: departure() + Duration::hours(8),
                booking_class: 'Y',
                quantity: 1,
            },
        )
        .unwrap();

    h.workspace
        .add_contact(&mut pnr, Some("+442071234567".to_string()), None)
        .unwrap();
    h.workspace.set_ticketing_arrangement(
        &mut pnr,
        departure() - Duration::days(10),
        "VX",
    );
    h.workspace.set_agency(&mut pnr, "91234565", None);
    h.workspace.quote_fares(&mut pnr, "USD", false).unwrap();
    h.workspace
        .store_fares(&mut pnr, &FareSelection::Cheapest)
        .unwrap();
    h.workspace.set_form_of_payment(&mut pnr, card());

    let locator = h.workspace.commit(&mut pnr).await.unwrap();

    let tickets = h.saga.issue(&mut pnr).await.unwrap();
    assert_eq!(tickets.len(), 1);
    h.workspace.commit(&mut pnr).await.unwrap();

    locator
}

#[tokio::test]
async fn test_full_reservation_flow() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    assert_eq!(locator.len(), 6);
    assert_eq!(h.ledger.remaining(&flight(), 'Y'), Some(49));

    let stored = h.workspace.retrieve(&locator).await.unwrap();
    assert_eq!(stored.status, PnrStatus::Ticketed);
    assert_eq!(stored.tickets.len(), 1);
    assert!(stored.tickets[0].number.starts_with("125"));

    // Check in 2 hours before departure: inside the window.
    let pass = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator: locator.clone(),
                passenger_id: 1,
                segment_number: 1,
                requested_seat: None,
            },
            departure() - Duration::hours(2),
        )
        .await
        .unwrap();

    assert_eq!(pass.flight_number, "VX101");
    assert_eq!(pass.origin, "LHR");
    assert_eq!(pass.destination, "JFK");
    assert_eq!(pass.booking_class, 'Y');
    let seat: vireo_catalog::Seat = pass.seat.parse().unwrap();

    let after = h.workspace.retrieve(&locator).await.unwrap();
    assert_eq!(
        after.tickets[0].coupons[0].status,
        CouponStatus::CheckedIn
    );
    assert_eq!(after.seat_for(1, 1).unwrap().seat, pass.seat);
    assert!(after.osis.iter().any(|o| o.text.starts_with("CKIN PAX 1")));
    assert!(!h.ledger.is_seat_available(&flight(), seat).unwrap());
}

#[tokio::test]
async fn test_checkin_window_scenarios() {
    let h = harness();
    let locator = ticketed_booking(&h).await;
    let request = CheckInRequest {
        locator,
        passenger_id: 1,
        segment_number: 1,
        requested_seat: None,
    };

    // 30 hours out: not yet open.
    let err = h
        .orchestrator
        .check_in(&request, departure() - Duration::hours(30))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::WindowNotOpen { .. }));

    // 40 minutes out: closed.
    let err = h
        .orchestrator
        .check_in(&request, departure() - Duration::minutes(40))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::WindowClosed { .. }));

    // 2 hours out: proceeds.
    h.orchestrator
        .check_in(&request, departure() - Duration::hours(2))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_requested_seat_validated_and_reserved() {
    let h = harness();
    let locator = ticketed_booking(&h).await;
    let now = departure() - Duration::hours(2);

    // Business cabin seat against an economy booking.
    let err = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator: locator.clone(),
                passenger_id: 1,
                segment_number: 1,
                requested_seat: Some("2A".to_string()),
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::SeatNotInCabin { .. }));

    let pass = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator: locator.clone(),
                passenger_id: 1,
                segment_number: 1,
                requested_seat: Some("12A".to_string()),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(pass.seat, "12A");
    assert!(!h
        .ledger
        .is_seat_available(&flight(), "12A".parse().unwrap())
        .unwrap());

    // Second attempt is already checked in.
    let err = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator,
                passenger_id: 1,
                segment_number: 1,
                requested_seat: None,
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::AlreadyCheckedIn));
}

#[tokio::test]
async fn test_advance_assignment_reused_at_checkin() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    let mut pnr = h.workspace.retrieve(&locator).await.unwrap();
    h.workspace.assign_seat(&mut pnr, 1, 1, "16C").unwrap();
    h.store.save(&pnr).await.unwrap();

    let pass = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator,
                passenger_id: 1,
                segment_number: 1,
                requested_seat: None,
            },
            departure() - Duration::hours(2),
        )
        .await
        .unwrap();

    assert_eq!(pass.seat, "16C");
}

#[tokio::test]
async fn test_cancel_checkin_and_board() {
    let h = harness();
    let locator = ticketed_booking(&h).await;
    let now = departure() - Duration::hours(2);
    let request = CheckInRequest {
        locator: locator.clone(),
        passenger_id: 1,
        segment_number: 1,
        requested_seat: None,
    };

    h.orchestrator.check_in(&request, now).await.unwrap();

    // Reverse, then check in again and board.
    h.orchestrator
        .cancel_check_in(&locator, 1, 1)
        .await
        .unwrap();
    let stored = h.workspace.retrieve(&locator).await.unwrap();
    assert_eq!(stored.tickets[0].coupons[0].status, CouponStatus::Open);
    // The seat survived the cancellation for re-use.
    assert!(stored.seat_for(1, 1).is_some());

    h.orchestrator.check_in(&request, now).await.unwrap();
    h.orchestrator.board(&locator, 1, 1, now).await.unwrap();

    let boarded = h.workspace.retrieve(&locator).await.unwrap();
    assert_eq!(boarded.tickets[0].coupons[0].status, CouponStatus::Used);

    // Boarding is terminal: no cancel afterwards.
    let err = h
        .orchestrator
        .cancel_check_in(&locator, 1, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::NotCheckedIn(CouponStatus::Used)));
}

#[tokio::test]
async fn test_batch_checkin_aggregates_failures() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    // Second passenger with no travel document, fares restored so the
    // booking tickets both.
    let mut pnr = h.workspace.retrieve(&locator).await.unwrap();
    let second = h.workspace.add_passenger(
        &mut pnr,
        NameInput {
            surname: "CHAPMAN".to_string(),
            given_name: "ROSS".to_string(),
            title: Some("MR".to_string()),
            passenger_type: PassengerType::Adult,
        },
    );
    pnr.tickets.push(vireo_pnr::models::Ticket {
        number: "1250000009997".to_string(),
        passenger_id: second,
        coupons: vec![vireo_pnr::models::Coupon {
            number: 1,
            segment_number: 1,
            fare_minor: 26_000,
            status: CouponStatus::Open,
        }],
        total_minor: 26_000,
        currency: "USD".to_string(),
        issued_at: Utc::now(),
    });
    h.store.save(&pnr).await.unwrap();

    let outcome = h
        .orchestrator
        .check_in_all(&locator, "VX101", departure() - Duration::hours(2))
        .await
        .unwrap();

    assert_eq!(outcome.passes.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].passenger_id, second);
    assert!(matches!(
        outcome.failures[0].error,
        CheckInError::NoTravelDocument(_)
    ));

    // The successful passenger stayed checked in despite the failure.
    let stored = h.workspace.retrieve(&locator).await.unwrap();
    assert_eq!(
        stored.tickets[0].coupons[0].status,
        CouponStatus::CheckedIn
    );
}

#[tokio::test]
async fn test_expiring_document_blocks_checkin() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    let mut pnr = h.workspace.retrieve(&locator).await.unwrap();
    // Expires 2027-06-30 against an Oct 2026 departure: under six months.
    pnr.passenger_mut(1).unwrap().documents = vec![passport(2027)];
    h.store.save(&pnr).await.unwrap();

    let err = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator,
                passenger_id: 1,
                segment_number: 1,
                requested_seat: None,
            },
            departure() - Duration::hours(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::DocumentExpiring { .. }));
}

#[tokio::test]
async fn test_missing_address_fails_apis() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    let mut pnr = h.workspace.retrieve(&locator).await.unwrap();
    pnr.ssrs.retain(|s| s.code != "DOCA");
    h.store.save(&pnr).await.unwrap();

    let err = h
        .orchestrator
        .check_in(
            &CheckInRequest {
                locator,
                passenger_id: 1,
                segment_number: 1,
                requested_seat: None,
            },
            departure() - Duration::hours(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckInError::Apis(ApisError::IncompleteAddress(_))
    ));
}

#[tokio::test]
async fn test_capture_failure_leaves_booking_unticketed() {
    let h = harness();

    // A separate saga wired to a capture-failing gateway.
    let failing = Arc::new(MockGateway::failing_capture());
    let saga = TicketingSaga::new(
        failing.clone(),
        TicketNumberGenerator::new("125", Arc::new(AtomicSequence::starting_at(500))),
    );

    let mut pnr = h.workspace.create_workspace("AGENT-09");
    let pax = h.workspace.add_passenger(
        &mut pnr,
        NameInput {
            surname: "OKAFOR".to_string(),
            given_name: "CHIKE".to_string(),
            title: None,
            passenger_type: PassengerType::Adult,
        },
    );
    h.workspace
        .add_document(&mut pnr, pax, passport(2033))
        .unwrap();
    h.workspace
        .sell_segment(
            &mut pnr,
            SellSegment {
                flight_number: "VX101".to_string(),
                aircraft_type: "B738".to_string(),
                origin: "LHR".to_string(),
                destination: "JFK".to_string(),
                departure: departure(),
                arrival: departure() + Duration::hours(8),
                booking_class: 'Y',
                quantity: 1,
            },
        )
        .unwrap();
    h.workspace
        .add_contact(&mut pnr, None, Some("chike@example.com".to_string()))
        .unwrap();
    h.workspace
        .set_ticketing_arrangement(&mut pnr, departure() - Duration::days(10), "VX");
    h.workspace.set_agency(&mut pnr, "91234565", None);
    h.workspace.quote_fares(&mut pnr, "USD", false).unwrap();
    h.workspace
        .store_fares(&mut pnr, &FareSelection::Cheapest)
        .unwrap();
    h.workspace.set_form_of_payment(&mut pnr, card());
    h.workspace.commit(&mut pnr).await.unwrap();

    let err = saga.issue(&mut pnr).await.unwrap_err();

    assert!(matches!(
        err,
        vireo_ticketing::TicketingError::CaptureFailed(_)
    ));
    assert_eq!(failing.reversal_count(), 1);
    assert!(pnr.tickets.is_empty());
    assert_eq!(pnr.status, PnrStatus::Confirmed);
    // The approving harness gateway was never involved.
    assert_eq!(h.gateway.reversal_count(), 0);
}

#[tokio::test]
async fn test_delete_after_ticketing_returns_everything() {
    let h = harness();
    let locator = ticketed_booking(&h).await;

    let mut pnr = h.workspace.retrieve(&locator).await.unwrap();
    h.workspace.assign_seat(&mut pnr, 1, 1, "12A").unwrap();
    h.store.save(&pnr).await.unwrap();
    assert_eq!(h.ledger.remaining(&flight(), 'Y'), Some(49));

    h.workspace.delete(&locator).await.unwrap();

    assert_eq!(h.ledger.remaining(&flight(), 'Y'), Some(50));
    assert!(h
        .ledger
        .is_seat_available(&flight(), "12A".parse().unwrap())
        .unwrap());
    assert!(h.store.get_by_locator(&locator).await.unwrap().is_none());
}
