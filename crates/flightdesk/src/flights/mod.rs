//! Flight index for flightdesk.
//!
//! This module provides the flight schedule: a binary search tree of
//! [`Flight`] records ordered by departure, plus an id lookup table so that
//! seat booking, update and removal by flight id walk the same tree.
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, NaiveTime};
//! use rust_decimal::Decimal;
//! use flightdesk::flights::{FlightIndex, FlightQuery, NewFlight};
//!
//! let mut index = FlightIndex::new();
//! let id = index
//!     .add_flight(NewFlight {
//!         origin: "Lahore".to_string(),
//!         destination: "Islamabad".to_string(),
//!         date: NaiveDate::from_ymd_opt(2024, 12, 15).unwrap(),
//!         time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
//!         fare: Decimal::new(18400, 0),
//!         seats: 50,
//!     })
//!     .unwrap();
//!
//! index.book_seats(id, 10).unwrap();
//! assert_eq!(index.get(id).unwrap().available_seats, 40);
//!
//! let query = FlightQuery {
//!     origin: Some("lahore".to_string()),
//!     ..FlightQuery::default()
//! };
//! assert_eq!(index.search(&query).len(), 1);
//! ```

mod tree;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use tree::InOrder;
use tree::ScheduleTree;

/// Date format accepted for flight dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format accepted for departure times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Identifier of a scheduled flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(pub u32);

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FlightId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Ordering key of the flight index: departure date, then time, then id.
pub type ScheduleKey = (NaiveDate, NaiveTime, FlightId);

/// A scheduled flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Identifier assigned by the index.
    pub id: FlightId,
    /// Departure city.
    pub origin: String,
    /// Arrival city.
    pub destination: String,
    /// Departure date.
    pub date: NaiveDate,
    /// Departure time of day.
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Fare per seat.
    pub fare: Decimal,
    /// Seats that can still be booked.
    pub available_seats: u32,
}

impl Flight {
    /// The key this flight is ordered by in the index.
    #[must_use]
    pub fn schedule_key(&self) -> ScheduleKey {
        (self.date, self.time, self.id)
    }

    /// Check whether the flight has no seats left.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.available_seats == 0
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flight {}: {} -> {}, {} {}, fare {}, {} seats available",
            self.id,
            self.origin,
            self.destination,
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT),
            self.fare,
            self.available_seats
        )
    }
}

/// Fields of a flight before the index assigns it an id.
///
/// Also the shape of a seed flight in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlight {
    /// Departure city.
    pub origin: String,
    /// Arrival city.
    pub destination: String,
    /// Departure date.
    pub date: NaiveDate,
    /// Departure time of day (`HH:MM`).
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Fare per seat.
    pub fare: Decimal,
    /// Seats offered.
    pub seats: u32,
}

impl NewFlight {
    /// Validate the route and fare.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFlight`] if a city is blank, origin and
    /// destination are the same, or the fare is negative.
    pub fn validate(&self) -> Result<()> {
        let origin = self.origin.trim();
        let destination = self.destination.trim();
        if origin.is_empty() {
            return Err(Error::invalid_flight("origin must not be empty"));
        }
        if destination.is_empty() {
            return Err(Error::invalid_flight("destination must not be empty"));
        }
        if origin.eq_ignore_ascii_case(destination) {
            return Err(Error::invalid_flight(format!(
                "origin and destination are both {origin}"
            )));
        }
        validate_fare(self.fare)
    }

    fn into_flight(self, id: FlightId) -> Flight {
        Flight {
            id,
            origin: self.origin.trim().to_string(),
            destination: self.destination.trim().to_string(),
            date: self.date,
            time: self.time,
            fare: self.fare,
            available_seats: self.seats,
        }
    }
}

/// Changes staff can make to an existing flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightUpdate {
    /// New departure date, or `None` to keep the current one.
    pub date: Option<NaiveDate>,
    /// New departure time.
    pub time: NaiveTime,
    /// New fare.
    pub fare: Decimal,
    /// New number of available seats.
    pub available_seats: u32,
}

/// Search criteria. A missing or blank field matches any flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightQuery {
    /// Departure city (case-insensitive).
    pub origin: Option<String>,
    /// Arrival city (case-insensitive).
    pub destination: Option<String>,
    /// Departure date.
    pub date: Option<NaiveDate>,
}

impl FlightQuery {
    /// Check whether a flight satisfies every given criterion.
    #[must_use]
    pub fn matches(&self, flight: &Flight) -> bool {
        fn city_matches(wanted: Option<&String>, actual: &str) -> bool {
            match wanted.map(|w| w.trim()).filter(|w| !w.is_empty()) {
                Some(wanted) => wanted.eq_ignore_ascii_case(actual),
                None => true,
            }
        }

        city_matches(self.origin.as_ref(), &flight.origin)
            && city_matches(self.destination.as_ref(), &flight.destination)
            && self.date.map_or(true, |date| date == flight.date)
    }
}

fn validate_fare(fare: Decimal) -> Result<()> {
    if fare.is_sign_negative() && !fare.is_zero() {
        return Err(Error::invalid_flight(format!(
            "fare must not be negative, got {fare}"
        )));
    }
    Ok(())
}

/// The flight schedule.
#[derive(Debug)]
pub struct FlightIndex {
    tree: ScheduleTree,
    keys: BTreeMap<FlightId, ScheduleKey>,
    next_id: u32,
}

impl Default for FlightIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightIndex {
    /// Create an empty index. The first flight added gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: ScheduleTree::default(),
            keys: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create an index holding the given flights, ids assigned in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any flight fails validation.
    pub fn with_flights(flights: impl IntoIterator<Item = NewFlight>) -> Result<Self> {
        let mut index = Self::new();
        for flight in flights {
            index.add_flight(flight)?;
        }
        Ok(index)
    }

    /// Schedule a new flight with the next sequential id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFlight`] if validation fails.
    pub fn add_flight(&mut self, flight: NewFlight) -> Result<FlightId> {
        flight.validate()?;
        let id = FlightId(self.next_id);
        self.insert(flight.into_flight(id))?;
        info!(flight_id = %id, height = self.tree.height(), "Flight scheduled");
        Ok(id)
    }

    /// Insert a flight that already carries an id.
    ///
    /// Later [`add_flight`](Self::add_flight) calls continue numbering after
    /// the highest id seen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFlight`] if the id is already scheduled.
    pub fn insert(&mut self, flight: Flight) -> Result<()> {
        let id = flight.id;
        if self.keys.contains_key(&id) {
            return Err(Error::DuplicateFlight { id });
        }
        let key = flight.schedule_key();
        self.tree
            .insert(flight)
            .map_err(|_| Error::DuplicateFlight { id })?;
        self.keys.insert(id, key);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        Ok(())
    }

    /// Look up a flight by id.
    #[must_use]
    pub fn get(&self, id: FlightId) -> Option<&Flight> {
        self.keys.get(&id).and_then(|key| self.tree.get(key))
    }

    fn get_mut(&mut self, id: FlightId) -> Result<&mut Flight> {
        let key = *self.keys.get(&id).ok_or(Error::FlightNotFound { id })?;
        self.tree
            .get_mut(&key)
            .ok_or_else(|| Error::internal(format!("flight {id} indexed but not in tree")))
    }

    /// All flights in schedule order.
    pub fn iter(&self) -> InOrder<'_> {
        self.tree.iter()
    }

    /// Flights matching the query, in schedule order.
    #[must_use]
    pub fn search(&self, query: &FlightQuery) -> Vec<&Flight> {
        let found: Vec<_> = self.iter().filter(|f| query.matches(f)).collect();
        debug!(?query, matches = found.len(), "Flight search");
        found
    }

    /// Take `seats` seats on a flight.
    ///
    /// Either all requested seats are taken or none are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeatCount`] for zero seats,
    /// [`Error::FlightNotFound`] for an unknown id and
    /// [`Error::InsufficientSeats`] if the flight has fewer seats left.
    pub fn book_seats(&mut self, id: FlightId, seats: u32) -> Result<&Flight> {
        if seats == 0 {
            return Err(Error::InvalidSeatCount);
        }
        let flight = self.get_mut(id)?;
        if flight.available_seats < seats {
            return Err(Error::InsufficientSeats {
                id,
                requested: seats,
                available: flight.available_seats,
            });
        }
        flight.available_seats -= seats;
        debug!(flight_id = %id, seats, remaining = flight.available_seats, "Seats booked");
        Ok(&*flight)
    }

    /// Change the schedule, fare and seat count of a flight. The id is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id and
    /// [`Error::InvalidFlight`] for a negative fare.
    pub fn update_flight(&mut self, id: FlightId, update: FlightUpdate) -> Result<&Flight> {
        validate_fare(update.fare)?;
        let old_key = *self.keys.get(&id).ok_or(Error::FlightNotFound { id })?;
        let new_key = (update.date.unwrap_or(old_key.0), update.time, id);

        if new_key == old_key {
            let flight = self.get_mut(id)?;
            flight.fare = update.fare;
            flight.available_seats = update.available_seats;
        } else {
            // Departure moved, so the node moves too.
            let mut flight = self
                .tree
                .remove(&old_key)
                .ok_or_else(|| Error::internal(format!("flight {id} indexed but not in tree")))?;
            flight.date = new_key.0;
            flight.time = new_key.1;
            flight.fare = update.fare;
            flight.available_seats = update.available_seats;
            self.tree
                .insert(flight)
                .map_err(|_| Error::DuplicateFlight { id })?;
            self.keys.insert(id, new_key);
        }

        info!(flight_id = %id, "Flight updated");
        self.tree
            .get(&new_key)
            .ok_or_else(|| Error::internal(format!("flight {id} lost during update")))
    }

    /// Remove a flight from the schedule and return it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id.
    pub fn remove_flight(&mut self, id: FlightId) -> Result<Flight> {
        let key = self.keys.remove(&id).ok_or(Error::FlightNotFound { id })?;
        let flight = self
            .tree
            .remove(&key)
            .ok_or_else(|| Error::internal(format!("flight {id} indexed but not in tree")))?;
        info!(flight_id = %id, "Flight removed");
        Ok(flight)
    }

    /// Number of scheduled flights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check whether no flights are scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> IntoIterator for &'a FlightIndex {
    type Item = &'a Flight;
    type IntoIter = InOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Serde adapter for `HH:MM` departure times.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub(crate) fn serialize<S: Serializer>(
        time: &NaiveTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    fn new_flight(origin: &str, destination: &str, at: &str, seats: u32) -> NewFlight {
        NewFlight {
            origin: origin.to_string(),
            destination: destination.to_string(),
            date: date("2024-12-15"),
            time: time(at),
            fare: Decimal::new(18400, 0),
            seats,
        }
    }

    fn times(index: &FlightIndex) -> Vec<String> {
        index
            .iter()
            .map(|f| f.time.format(TIME_FORMAT).to_string())
            .collect()
    }

    #[test]
    fn test_ids_start_at_one() {
        let mut index = FlightIndex::new();
        let a = index
            .add_flight(new_flight("Lahore", "Islamabad", "08:00", 50))
            .unwrap();
        let b = index
            .add_flight(new_flight("Islamabad", "Karachi", "12:00", 60))
            .unwrap();
        assert_eq!(a, FlightId(1));
        assert_eq!(b, FlightId(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_in_order_regardless_of_insertion_sequence() {
        let orders = [
            ["08:00", "12:00", "16:00"],
            ["16:00", "12:00", "08:00"],
            ["12:00", "16:00", "08:00"],
            ["12:00", "08:00", "16:00"],
        ];
        for order in orders {
            let mut index = FlightIndex::new();
            for at in order {
                index.add_flight(new_flight("A", "B", at, 10)).unwrap();
            }
            assert_eq!(times(&index), vec!["08:00", "12:00", "16:00"]);
        }
    }

    #[test]
    fn test_in_order_sorts_by_date_before_time() {
        let mut index = FlightIndex::new();
        let mut late = new_flight("A", "B", "06:00", 10);
        late.date = date("2024-12-16");
        index.add_flight(late).unwrap();
        index.add_flight(new_flight("A", "B", "22:00", 10)).unwrap();

        let ids: Vec<_> = index.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![FlightId(2), FlightId(1)]);
    }

    #[test]
    fn test_book_then_overbook() {
        let mut index = FlightIndex::new();
        let id = index.add_flight(new_flight("A", "B", "08:00", 50)).unwrap();

        assert_eq!(index.book_seats(id, 10).unwrap().available_seats, 40);
        let err = index.book_seats(id, 45).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSeats {
                requested: 45,
                available: 40,
                ..
            }
        ));
        assert_eq!(index.get(id).unwrap().available_seats, 40);
    }

    #[test]
    fn test_book_to_zero_then_fail() {
        let mut index = FlightIndex::new();
        let id = index.add_flight(new_flight("A", "B", "08:00", 3)).unwrap();
        index.book_seats(id, 3).unwrap();
        assert!(index.get(id).unwrap().is_full());
        assert!(index.book_seats(id, 1).is_err());
    }

    #[test]
    fn test_book_unknown_flight() {
        let mut index = FlightIndex::new();
        let err = index.book_seats(FlightId(99), 1).unwrap_err();
        assert!(matches!(err, Error::FlightNotFound { id: FlightId(99) }));
    }

    #[test]
    fn test_book_zero_seats() {
        let mut index = FlightIndex::new();
        let id = index.add_flight(new_flight("A", "B", "08:00", 3)).unwrap();
        assert!(matches!(
            index.book_seats(id, 0).unwrap_err(),
            Error::InvalidSeatCount
        ));
    }

    #[test]
    fn test_search_blank_fields_match_any() {
        let index = FlightIndex::with_flights([
            new_flight("Lahore", "Islamabad", "08:00", 50),
            new_flight("Islamabad", "Karachi", "12:00", 60),
            new_flight("Karachi", "Lahore", "16:00", 40),
        ])
        .unwrap();

        let all = FlightQuery {
            origin: Some("  ".to_string()),
            destination: Some(String::new()),
            date: None,
        };
        assert_eq!(index.search(&all).len(), 3);

        let to_lahore = FlightQuery {
            destination: Some("LAHORE".to_string()),
            ..FlightQuery::default()
        };
        let found = index.search(&to_lahore);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].origin, "Karachi");

        let other_day = FlightQuery {
            date: Some(date("2025-01-01")),
            ..FlightQuery::default()
        };
        assert!(index.search(&other_day).is_empty());
    }

    #[test]
    fn test_update_by_id_after_unordered_inserts() {
        // Ids and departure times deliberately disagree.
        let mut index = FlightIndex::with_flights([
            new_flight("A", "B", "16:00", 10),
            new_flight("A", "B", "08:00", 10),
            new_flight("A", "B", "12:00", 10),
        ])
        .unwrap();

        let updated = index
            .update_flight(
                FlightId(1),
                FlightUpdate {
                    date: None,
                    time: time("06:00"),
                    fare: Decimal::new(500, 0),
                    available_seats: 7,
                },
            )
            .unwrap();
        assert_eq!(updated.id, FlightId(1));
        assert_eq!(updated.available_seats, 7);

        assert_eq!(times(&index), vec!["06:00", "08:00", "12:00"]);
        assert_eq!(index.get(FlightId(1)).unwrap().fare, Decimal::new(500, 0));
    }

    #[test]
    fn test_update_in_place_keeps_position() {
        let mut index = FlightIndex::with_flights([new_flight("A", "B", "08:00", 10)]).unwrap();
        index
            .update_flight(
                FlightId(1),
                FlightUpdate {
                    date: None,
                    time: time("08:00"),
                    fare: Decimal::new(1, 0),
                    available_seats: 0,
                },
            )
            .unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get(FlightId(1)).unwrap().is_full());
    }

    #[test]
    fn test_update_rejects_negative_fare() {
        let mut index = FlightIndex::with_flights([new_flight("A", "B", "08:00", 10)]).unwrap();
        let err = index
            .update_flight(
                FlightId(1),
                FlightUpdate {
                    date: None,
                    time: time("09:00"),
                    fare: Decimal::new(-1, 0),
                    available_seats: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFlight { .. }));
        assert_eq!(times(&index), vec!["08:00"]);
    }

    #[test]
    fn test_update_unknown_flight() {
        let mut index = FlightIndex::new();
        let err = index
            .update_flight(
                FlightId(3),
                FlightUpdate {
                    date: None,
                    time: time("09:00"),
                    fare: Decimal::ZERO,
                    available_seats: 1,
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remove_by_id_after_unordered_inserts() {
        let mut index = FlightIndex::with_flights([
            new_flight("A", "B", "16:00", 10),
            new_flight("A", "B", "08:00", 10),
            new_flight("A", "B", "12:00", 10),
        ])
        .unwrap();

        let removed = index.remove_flight(FlightId(1)).unwrap();
        assert_eq!(removed.time, time("16:00"));
        assert_eq!(times(&index), vec!["08:00", "12:00"]);
        assert!(index.get(FlightId(1)).is_none());
        assert!(index.remove_flight(FlightId(1)).unwrap_err().is_not_found());
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut index = FlightIndex::with_flights([new_flight("A", "B", "08:00", 10)]).unwrap();
        index.remove_flight(FlightId(1)).unwrap();
        let id = index.add_flight(new_flight("A", "B", "09:00", 10)).unwrap();
        assert_eq!(id, FlightId(2));
    }

    #[test]
    fn test_insert_with_explicit_id() {
        let mut index = FlightIndex::new();
        let flight = new_flight("A", "B", "08:00", 10).into_flight(FlightId(10));
        index.insert(flight.clone()).unwrap();
        assert!(matches!(
            index.insert(flight).unwrap_err(),
            Error::DuplicateFlight { id: FlightId(10) }
        ));
        let next = index.add_flight(new_flight("A", "B", "09:00", 10)).unwrap();
        assert_eq!(next, FlightId(11));
    }

    #[test]
    fn test_new_flight_validation() {
        assert!(new_flight("Lahore", "Karachi", "08:00", 1).validate().is_ok());
        assert!(new_flight(" ", "Karachi", "08:00", 1).validate().is_err());
        assert!(new_flight("Lahore", "", "08:00", 1).validate().is_err());
        assert!(new_flight("Lahore", "lahore", "08:00", 1).validate().is_err());

        let mut negative = new_flight("Lahore", "Karachi", "08:00", 1);
        negative.fare = Decimal::new(-100, 0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_flight_id_parse() {
        assert_eq!(" 42 ".parse::<FlightId>().unwrap(), FlightId(42));
        assert!("abc".parse::<FlightId>().is_err());
        assert!("-1".parse::<FlightId>().is_err());
    }

    #[test]
    fn test_flight_display() {
        let flight = new_flight("Lahore", "Islamabad", "08:00", 50).into_flight(FlightId(1));
        let shown = flight.to_string();
        assert!(shown.contains("Flight 1"));
        assert!(shown.contains("Lahore -> Islamabad"));
        assert!(shown.contains("2024-12-15 08:00"));
        assert!(shown.contains("50 seats"));
    }

    #[test]
    fn test_flight_serializes_time_as_hhmm() {
        let flight = new_flight("Lahore", "Islamabad", "08:00", 50).into_flight(FlightId(1));
        let json = serde_json::to_value(&flight).unwrap();
        assert_eq!(json["time"], "08:00");
        assert_eq!(json["date"], "2024-12-15");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_new_flight_deserializes_from_json() {
        let json = r#"{
            "origin": "Karachi",
            "destination": "Lahore",
            "date": "2024-12-15",
            "time": "16:00",
            "fare": "67120",
            "seats": 40
        }"#;
        let flight: NewFlight = serde_json::from_str(json).unwrap();
        assert_eq!(flight.time, time("16:00"));
        assert_eq!(flight.fare, Decimal::new(67120, 0));
    }
}
