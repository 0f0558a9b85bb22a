//! End-to-end console sessions driven from scripted input.

use std::io::Cursor;

use flightdesk::console::{Console, Session};
use flightdesk::users::{NewUser, Role};
use flightdesk::{Config, Desk, FlightId};
use rust_decimal::Decimal;
use tempfile::TempDir;

fn run_script(desk: &mut Desk, lines: &[&str]) -> String {
    let mut input = lines.join("\n");
    input.push('\n');
    let console = Console::new(Cursor::new(input.into_bytes()), Vec::new());
    let mut session = Session::new(desk, console);
    session.run().unwrap();
    String::from_utf8(session.into_console().into_inner().1).unwrap()
}

fn seeded_desk() -> Desk {
    Desk::in_memory(&Config::default()).unwrap()
}

fn add(desk: &mut Desk, email: &str, role: Role) {
    desk.add_user(NewUser {
        name: format!("{role} User"),
        email: email.to_string(),
        password: "longenough1".to_string(),
        role,
    })
    .unwrap();
}

#[test]
fn passenger_books_and_pays_in_one_go() {
    let mut desk = seeded_desk();
    add(&mut desk, "ali@example.com", Role::Passenger);

    let out = run_script(
        &mut desk,
        &[
            "2",
            "ali@example.com",
            "longenough1",
            "3", // book
            "1",
            "2",
            "Ali Raza",
            "Hina Raza",
            "y",
            "y", // pay now
            "HBL",
            "Ali Raza",
            "4242 4242 4242 4242",
            "09/29",
            "123",
            "4", // my bookings
            "7",
        ],
    );

    assert!(out.contains("Booked. Booking ids: 1, 2"));
    assert!(out.contains("Payment of 36800 PKR accepted for 2 booking(s), card ending 4242."));
    assert!(out.contains("Booking 1: Ali Raza, flight 1"));
    assert!(out.contains("paid: yes"));

    assert_eq!(desk.ledger().len(), 2);
    assert_eq!(desk.ledger().total_paid(), Decimal::new(36800, 0));
    assert_eq!(desk.flights().get(FlightId(1)).unwrap().available_seats, 48);
}

#[test]
fn passenger_pays_later() {
    let mut desk = seeded_desk();
    add(&mut desk, "ali@example.com", Role::Passenger);

    let out = run_script(
        &mut desk,
        &[
            "2",
            "ali@example.com",
            "longenough1",
            "3",
            "3",
            "1",
            "Ali Raza",
            "y",
            "n", // pay later
            "5", // pay outstanding
            "y",
            "HBL",
            "Ali Raza",
            "1234", // too short, re-prompted
            "4242424242424242",
            "13/29", // bad month, re-prompted
            "12/29",
            "12", // bad cvv, re-prompted
            "123",
            "5",
            "7",
        ],
    );

    assert!(out.contains("You can pay later from the passenger menu."));
    assert!(out.contains("Pay 67120 PKR for bookings 1?"));
    assert!(out.contains("Invalid input: payment rejected: card number must be 16 digits"));
    assert!(out.contains("Invalid input: payment rejected: expiry must be MM/YY"));
    assert!(out.contains("Invalid input: payment rejected: cvv must be 3 digits"));
    assert!(out.contains("Nothing to pay."));
    assert!(desk.ledger().get(flightdesk::BookingId(1)).unwrap().is_paid());
}

#[test]
fn overbooking_is_refused_at_the_prompt() {
    let mut desk = seeded_desk();
    add(&mut desk, "ali@example.com", Role::Passenger);

    let out = run_script(
        &mut desk,
        &[
            "2",
            "ali@example.com",
            "longenough1",
            "3",
            "3",
            "41",
            "0",
            "1",
            "Ali Raza",
            "n", // decline confirmation
            "7",
        ],
    );

    assert_eq!(out.matches("enter a number from 1 to 40").count(), 2);
    assert!(out.contains("Booking cancelled."));
    assert!(desk.ledger().is_empty());
    assert_eq!(desk.flights().get(FlightId(3)).unwrap().available_seats, 40);
}

#[test]
fn passenger_search_by_route() {
    let mut desk = seeded_desk();
    add(&mut desk, "ali@example.com", Role::Passenger);

    let out = run_script(
        &mut desk,
        &[
            "2",
            "ali@example.com",
            "longenough1",
            "2",
            "islamabad",
            "",
            "2024-12-15",
            "2",
            "Quetta",
            "",
            "",
            "7",
        ],
    );

    assert!(out.contains("Islamabad      Karachi"));
    assert!(out.contains("No flights found."));
}

#[test]
fn staff_maintains_schedule() {
    let mut desk = seeded_desk();
    add(&mut desk, "crew@example.com", Role::Staff);
    desk.book(FlightId(2), &["Sana".to_string()]).unwrap();

    let out = run_script(
        &mut desk,
        &[
            "2",
            "crew@example.com",
            "longenough1",
            "2", // add
            "Peshawar",
            "Lahore",
            "2024-12-14",
            "25:00", // bad time, re-prompted
            "06:30",
            "-5", // negative fare, re-prompted
            "9000",
            "30",
            "3", // update flight 1
            "1",
            "",
            "18:45",
            "",
            "45",
            "5", // manifest
            "2",
            "4", // remove
            "2",
            "y",
            "1", // list
            "6",
            "3",
        ],
    );

    assert!(out.contains("Flight 4 scheduled."));
    assert!(out.contains("Invalid input: expected HH:MM"));
    assert!(out.contains("Invalid input: fare must not be negative"));
    assert!(out.contains("Updated: Flight 1: Lahore -> Islamabad, 2024-12-15 18:45, fare 18400, 45 seats available"));
    assert!(out.contains("Booking 1: Sana, flight 2"));
    assert!(out.contains("Removed flight 2 (Islamabad -> Karachi)."));

    // Peshawar departs a day earlier, flight 1 moved behind flight 3.
    let order: Vec<u32> = desk.flights().iter().map(|f| f.id.0).collect();
    assert_eq!(order, vec![4, 3, 1]);
    assert_eq!(desk.manifest(FlightId(2)).len(), 1);
}

#[test]
fn staff_update_of_unknown_flight_reports_error() {
    let mut desk = seeded_desk();
    add(&mut desk, "crew@example.com", Role::Staff);

    let out = run_script(
        &mut desk,
        &["2", "crew@example.com", "longenough1", "3", "99", "7"],
    );

    assert!(out.contains("Error: flight 99 not found"));
    assert!(out.contains("=== Staff menu ==="));
}

#[test]
fn admin_manages_users_and_audits_bookings() {
    let mut desk = seeded_desk();
    add(&mut desk, "root@example.com", Role::Admin);
    add(&mut desk, "old@example.com", Role::Passenger);
    let ids = desk
        .book(FlightId(1), &["Ali".to_string(), "Sana".to_string()])
        .unwrap();
    desk.pay(
        &ids[..1],
        &flightdesk::payment::PaymentDetails {
            bank: "UBL".to_string(),
            cardholder: "Ali".to_string(),
            card_number: "4000000000000002".to_string(),
            expiry: "01/30".to_string(),
            cvv: "999".to_string(),
        },
        "Ali",
    )
    .unwrap();

    let out = run_script(
        &mut desk,
        &[
            "2",
            "root@example.com",
            "longenough1",
            "1", // add staff, no key needed
            "New Crew",
            "newcrew@example.com",
            "short1", // too short, re-prompted
            "longenough1",
            "2",
            "2", // remove user
            "old@example.com",
            "2", // remove self
            "root@example.com",
            "3", // list
            "4", // bookings
            "5", // logout
            "3",
        ],
    );

    assert!(out.contains("Invalid input: password rejected: must be at least 8 characters"));
    assert!(out.contains("Added newcrew@example.com as Staff."));
    assert!(out.contains("Removed old@example.com."));
    assert!(out.contains("You cannot remove the account you are signed in with."));
    assert!(out.contains("2 booking(s), 1 paid. Total paid: 18400 PKR. Outstanding: 18400 PKR."));
    assert!(out.contains("Goodbye, Admin User."));

    let emails: Vec<&str> = desk.users().users().iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["newcrew@example.com", "root@example.com"]);
}

#[test]
fn registration_persists_across_desks() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.users_file = Some(dir.path().join("users.txt"));

    let mut desk = Desk::from_config(&config).unwrap();
    run_script(
        &mut desk,
        &[
            "1",
            "Mehwish Ali Khan",
            "Mehwish@Example.com",
            "longenough1",
            "3",
            "1234",
            "3",
        ],
    );

    let contents = std::fs::read_to_string(dir.path().join("users.txt")).unwrap();
    assert!(contents.contains("mehwish@example.com"));
    assert!(!contents.contains("longenough1"));

    let reopened = Desk::from_config(&config).unwrap();
    let user = reopened.login("mehwish@example.com", "longenough1").unwrap();
    assert_eq!(user.name, "Mehwish Ali Khan");
    assert_eq!(user.role, Role::Admin);
}

#[test]
fn input_ending_mid_menu_exits_cleanly() {
    let mut desk = seeded_desk();
    add(&mut desk, "ali@example.com", Role::Passenger);

    let out = run_script(&mut desk, &["2", "ali@example.com", "longenough1", "3", "1"]);

    assert!(out.ends_with("Thank you for flying with GIKI Airlines.\n"));
    assert!(desk.ledger().is_empty());
}
