//! Booking ledger for flightdesk.
//!
//! The ledger is an append-only record of passenger bookings. Each booked seat
//! becomes one [`Booking`] and bookings are never removed. The only change a
//! booking ever sees is the payment being attached to it.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flights::{hhmm, Flight, FlightId, DATE_FORMAT, TIME_FORMAT};
use crate::payment::Payment;

/// Identifier of a booking, assigned sequentially from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment state of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing has been paid yet.
    Unpaid,
    /// The fare has been paid.
    Paid(Payment),
}

/// One passenger's seat on one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Identifier assigned by the ledger.
    pub id: BookingId,
    /// Passenger name.
    pub passenger: String,
    /// The booked flight.
    pub flight_id: FlightId,
    /// Departure date of the flight when booked.
    pub date: NaiveDate,
    /// Departure time of the flight when booked.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Fare charged for this seat.
    pub fare: Decimal,
    /// Payment state.
    pub payment: PaymentStatus,
}

impl Booking {
    /// Check whether the booking has been paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        matches!(self.payment, PaymentStatus::Paid(_))
    }

    /// Amount paid so far (zero when unpaid).
    #[must_use]
    pub fn amount_paid(&self) -> Decimal {
        match &self.payment {
            PaymentStatus::Paid(payment) => payment.amount,
            PaymentStatus::Unpaid => Decimal::ZERO,
        }
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking {}: {}, flight {}, {} {}, fare {}, paid: {}, amount paid: {}",
            self.id,
            self.passenger,
            self.flight_id,
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT),
            self.fare,
            if self.is_paid() { "yes" } else { "no" },
            self.amount_paid()
        )
    }
}

/// A booking before the ledger assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// Passenger name.
    pub passenger: String,
    /// The booked flight.
    pub flight_id: FlightId,
    /// Departure date.
    pub date: NaiveDate,
    /// Departure time.
    pub time: NaiveTime,
    /// Fare charged for this seat.
    pub fare: Decimal,
}

impl NewBooking {
    /// A booking for one passenger on the given flight, at its current fare.
    #[must_use]
    pub fn for_flight(flight: &Flight, passenger: impl Into<String>) -> Self {
        Self {
            passenger: passenger.into(),
            flight_id: flight.id,
            date: flight.date,
            time: flight.time,
            fare: flight.fare,
        }
    }
}

/// Append-only ledger of bookings, kept in submission order.
#[derive(Debug, Default)]
pub struct BookingLedger {
    bookings: Vec<Booking>,
    last_id: u64,
}

impl BookingLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a booking and return its id.
    pub fn append(&mut self, booking: NewBooking) -> BookingId {
        self.last_id += 1;
        let id = BookingId(self.last_id);
        debug!(booking_id = %id, flight_id = %booking.flight_id, "Booking appended");
        self.bookings.push(Booking {
            id,
            passenger: booking.passenger,
            flight_id: booking.flight_id,
            date: booking.date,
            time: booking.time,
            fare: booking.fare,
            payment: PaymentStatus::Unpaid,
        });
        id
    }

    /// All bookings in the order they were made.
    pub fn iter(&self) -> std::slice::Iter<'_, Booking> {
        self.bookings.iter()
    }

    /// Look up a booking by id.
    #[must_use]
    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        // Ids are dense and never removed, so the position is known.
        usize::try_from(id.0)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|pos| self.bookings.get(pos))
            .filter(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BookingId) -> Result<&mut Booking> {
        usize::try_from(id.0)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|pos| self.bookings.get_mut(pos))
            .filter(|b| b.id == id)
            .ok_or(Error::BookingNotFound { id })
    }

    /// Bookings made under a passenger name (case-insensitive).
    pub fn for_passenger(&self, name: &str) -> impl Iterator<Item = &Booking> + '_ {
        let name = name.trim().to_owned();
        self.bookings
            .iter()
            .filter(move |b| b.passenger.eq_ignore_ascii_case(&name))
    }

    /// Bookings on one flight.
    pub fn for_flight(&self, flight_id: FlightId) -> impl Iterator<Item = &Booking> + '_ {
        self.bookings
            .iter()
            .filter(move |b| b.flight_id == flight_id)
    }

    /// Bookings that have not been paid.
    pub fn outstanding(&self) -> impl Iterator<Item = &Booking> + '_ {
        self.bookings.iter().filter(|b| !b.is_paid())
    }

    /// Sum of all payments recorded on the ledger.
    #[must_use]
    pub fn total_paid(&self) -> Decimal {
        self.bookings.iter().map(Booking::amount_paid).sum()
    }

    /// Check that a booking exists and is still unpaid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BookingNotFound`] or [`Error::AlreadyPaid`].
    pub fn ensure_payable(&self, id: BookingId) -> Result<&Booking> {
        let booking = self.get(id).ok_or(Error::BookingNotFound { id })?;
        if booking.is_paid() {
            return Err(Error::AlreadyPaid { id });
        }
        Ok(booking)
    }

    /// Attach a payment to a booking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BookingNotFound`] for an unknown id and
    /// [`Error::AlreadyPaid`] if a payment is already attached.
    pub fn record_payment(&mut self, id: BookingId, payment: Payment) -> Result<&Booking> {
        let booking = self.get_mut(id)?;
        if booking.is_paid() {
            return Err(Error::AlreadyPaid { id });
        }
        info!(booking_id = %id, amount = %payment.amount, "Payment recorded");
        booking.payment = PaymentStatus::Paid(payment);
        Ok(&*booking)
    }

    /// Number of bookings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    /// Check whether no bookings have been made.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

impl<'a> IntoIterator for &'a BookingLedger {
    type Item = &'a Booking;
    type IntoIter = std::slice::Iter<'a, Booking>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
