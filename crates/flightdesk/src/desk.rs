//! The booking desk: one context owning the schedule, the ledger and the
//! user table.
//!
//! Every interactive screen and CLI command works through a [`Desk`]. It
//! enforces the rules that span more than one store, such as reserving seats
//! before any booking is written or validating a card before any payment is
//! attached.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AccessConfig, AirlineConfig, Config};
use crate::error::{Error, Result};
use crate::flights::{Flight, FlightId, FlightIndex, FlightQuery, FlightUpdate, NewFlight};
use crate::ledger::{Booking, BookingId, BookingLedger, NewBooking};
use crate::payment::{self, PaymentDetails};
use crate::users::{NewUser, Role, User, UserStore};

/// Summary of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Bookings that were paid, in the order given.
    pub bookings: Vec<BookingId>,
    /// Sum charged across all bookings.
    pub total: Decimal,
    /// Last four digits of the card used.
    pub card_last4: String,
}

/// Process-wide booking context.
#[derive(Debug)]
pub struct Desk {
    airline: AirlineConfig,
    access: AccessConfig,
    flights: FlightIndex,
    ledger: BookingLedger,
    users: UserStore,
}

impl Desk {
    /// Build a desk from configuration, loading the users file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the users file
    /// cannot be read.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let users = UserStore::open(config.users_file(), config.password_policy())?;
        Self::with_store(config, users)
    }

    /// Build a desk whose user table lives in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn in_memory(config: &Config) -> Result<Self> {
        config.validate()?;
        let users = UserStore::in_memory(config.password_policy());
        Self::with_store(config, users)
    }

    fn with_store(config: &Config, users: UserStore) -> Result<Self> {
        let flights = FlightIndex::with_flights(config.seed_flights().iter().cloned())?;
        info!(
            flights = flights.len(),
            users = users.len(),
            airline = %config.airline.name,
            "Desk ready"
        );
        Ok(Self {
            airline: config.airline.clone(),
            access: config.access.clone(),
            flights,
            ledger: BookingLedger::new(),
            users,
        })
    }

    /// Airline name shown in greetings.
    #[must_use]
    pub fn airline_name(&self) -> &str {
        &self.airline.name
    }

    /// Currency code printed next to amounts.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.airline.currency
    }

    /// The flight schedule.
    #[must_use]
    pub fn flights(&self) -> &FlightIndex {
        &self.flights
    }

    /// The booking ledger.
    #[must_use]
    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// The user table.
    #[must_use]
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Search the schedule.
    #[must_use]
    pub fn search(&self, query: &FlightQuery) -> Vec<&Flight> {
        self.flights.search(query)
    }

    // === Passenger operations ===

    /// Book one seat per passenger on a flight.
    ///
    /// Seats are reserved for the whole party first; bookings are only
    /// appended once the reservation succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPassengers`] for an empty party,
    /// [`Error::InvalidName`] for a blank name, and the index errors of
    /// [`FlightIndex::book_seats`].
    pub fn book(&mut self, flight_id: FlightId, passengers: &[String]) -> Result<Vec<BookingId>> {
        if passengers.is_empty() {
            return Err(Error::NoPassengers);
        }
        let names: Vec<&str> = passengers.iter().map(|p| p.trim()).collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(Error::InvalidName);
        }
        let seats = u32::try_from(names.len()).map_err(|_| Error::InsufficientSeats {
            id: flight_id,
            requested: u32::MAX,
            available: self.flights.get(flight_id).map_or(0, |f| f.available_seats),
        })?;

        let flight = self.flights.book_seats(flight_id, seats)?;
        let ids: Vec<BookingId> = names
            .into_iter()
            .map(|name| self.ledger.append(NewBooking::for_flight(flight, name)))
            .collect();

        info!(flight_id = %flight_id, seats, "Seats booked");
        Ok(ids)
    }

    /// Pay for bookings with one card.
    ///
    /// The card and every booking are checked before anything is charged, so
    /// either all listed bookings are paid or none is. Repeated ids are paid
    /// once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaymentRejected`] for bad card details, or
    /// [`Error::BookingNotFound`] / [`Error::AlreadyPaid`] for a booking that
    /// cannot be paid.
    pub fn pay(
        &mut self,
        booking_ids: &[BookingId],
        details: &PaymentDetails,
        payer: &str,
    ) -> Result<Receipt> {
        details.validate()?;

        let mut ids: Vec<BookingId> = Vec::with_capacity(booking_ids.len());
        for &id in booking_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        for &id in &ids {
            self.ledger.ensure_payable(id)?;
        }

        let mut total = Decimal::ZERO;
        let mut card_last4 = String::new();
        for &id in &ids {
            let fare = self.ledger.ensure_payable(id)?.fare;
            let payment = payment::charge(details, fare, payer)?;
            card_last4.clone_from(&payment.card_last4);
            total += payment.amount;
            self.ledger.record_payment(id, payment)?;
        }

        info!(bookings = ids.len(), %total, "Bookings paid");
        Ok(Receipt {
            bookings: ids,
            total,
            card_last4,
        })
    }

    // === Staff operations ===

    /// Schedule a new flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFlight`] if the flight fails validation.
    pub fn add_flight(&mut self, flight: NewFlight) -> Result<FlightId> {
        self.flights.add_flight(flight)
    }

    /// Change a flight's departure, fare or seat count.
    ///
    /// # Errors
    ///
    /// See [`FlightIndex::update_flight`].
    pub fn update_flight(&mut self, id: FlightId, update: FlightUpdate) -> Result<&Flight> {
        self.flights.update_flight(id, update)
    }

    /// Take a flight off the schedule. Its bookings stay on the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id.
    pub fn remove_flight(&mut self, id: FlightId) -> Result<Flight> {
        let flight = self.flights.remove_flight(id)?;
        let booked = self.ledger.for_flight(id).count();
        if booked > 0 {
            warn!(flight_id = %id, bookings = booked, "Removed flight still has bookings");
        }
        Ok(flight)
    }

    /// Bookings on one flight, in booking order.
    #[must_use]
    pub fn manifest(&self, id: FlightId) -> Vec<&Booking> {
        self.ledger.for_flight(id).collect()
    }

    // === Account operations ===

    /// Register a user. Staff and admin registrations need the matching
    /// access key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] for a missing or wrong key, and the
    /// errors of [`UserStore::register`].
    pub fn register(&mut self, new_user: NewUser, access_key: Option<&str>) -> Result<&User> {
        self.check_access(new_user.role, access_key)?;
        self.users.register(new_user)
    }

    /// Register a user on an admin's behalf. No access key is checked.
    ///
    /// # Errors
    ///
    /// See [`UserStore::register`].
    pub fn add_user(&mut self, new_user: NewUser) -> Result<&User> {
        self.users.register(new_user)
    }

    /// Sign in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] on any mismatch.
    pub fn login(&self, email: &str, password: &str) -> Result<&User> {
        self.users.login(email, password)
    }

    /// Remove a user from the table.
    ///
    /// # Errors
    ///
    /// See [`UserStore::remove`].
    pub fn remove_user(&mut self, email: &str) -> Result<User> {
        self.users.remove(email)
    }

    fn check_access(&self, role: Role, access_key: Option<&str>) -> Result<()> {
        let expected = match role {
            Role::Passenger => return Ok(()),
            Role::Staff => &self.access.staff_key,
            Role::Admin => &self.access.admin_key,
        };
        if access_key.map(str::trim) == Some(expected.as_str()) {
            Ok(())
        } else {
            warn!(%role, "Access key rejected");
            Err(Error::AccessDenied { role })
        }
    }
}
