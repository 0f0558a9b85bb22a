//! Interactive console for flightdesk.
//!
//! [`Console`] wraps any line-based input and output with prompt helpers.
//! [`Session`] drives the menu screens over a [`Desk`] as a small state
//! machine: every screen handles one choice and names the screen to show
//! next. End of input ends the session as if Exit had been chosen.

use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::desk::Desk;
use crate::error::{Error, Result};
use crate::flights::{
    Flight, FlightId, FlightQuery, FlightUpdate, NewFlight, DATE_FORMAT, TIME_FORMAT,
};
use crate::ledger::{Booking, BookingId};
use crate::payment::{
    normalize_card_number, validate_card_number, validate_cvv, validate_expiry, PaymentDetails,
};
use crate::users::{validate_email, NewUser, Role, User};

/// Write flights as aligned columns.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_flight_table<W: Write>(
    out: &mut W,
    flights: &[&Flight],
    currency: &str,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>4}  {:<14} {:<14} {:<10} {:<5} {:>14} {:>6}",
        "ID",
        "FROM",
        "TO",
        "DATE",
        "TIME",
        format!("FARE ({currency})"),
        "SEATS"
    )?;
    for flight in flights {
        writeln!(
            out,
            "{:>4}  {:<14} {:<14} {:<10} {:<5} {:>14} {:>6}",
            flight.id.0,
            flight.origin,
            flight.destination,
            flight.date.format(DATE_FORMAT).to_string(),
            flight.time.format(TIME_FORMAT).to_string(),
            flight.fare.to_string(),
            flight.available_seats
        )?;
    }
    Ok(())
}

/// Line-oriented prompt helpers over an input and an output.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Create a console.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Give back the input and output.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Print one line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the output cannot be written.
    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Ask for a line of input, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_line(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Ask for a line; an empty answer means "none".
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_optional(&mut self, label: &str) -> Result<Option<String>> {
        let line = self.prompt_line(label)?;
        Ok((!line.is_empty()).then_some(line))
    }

    /// Ask until `parse` accepts the answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_with<T>(
        &mut self,
        label: &str,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Result<T> {
        loop {
            let line = self.prompt_line(label)?;
            match parse(&line) {
                Ok(value) => return Ok(value),
                Err(message) => self.say(format_args!("Invalid input: {message}"))?,
            }
        }
    }

    /// Ask until the answer parses as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_parse<T>(&mut self, label: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.prompt_with(label, |s| s.parse::<T>().map_err(|e| e.to_string()))
    }

    /// Ask until `validate` accepts the answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_validated(
        &mut self,
        label: &str,
        validate: impl Fn(&str) -> Result<()>,
    ) -> Result<String> {
        self.prompt_with(label, |s| {
            validate(s).map(|()| s.to_string()).map_err(|e| e.to_string())
        })
    }

    /// Ask for a replacement value; an empty answer keeps `current`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn prompt_or<T: Clone>(
        &mut self,
        label: &str,
        current: T,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Result<T> {
        self.prompt_with(label, |s| {
            if s.is_empty() {
                Ok(current.clone())
            } else {
                parse(s)
            }
        })
    }

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        self.prompt_with(&format!("{question} [y/n]"), |s| {
            match s.to_ascii_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                _ => Err("answer y or n".to_string()),
            }
        })
    }

    /// Show a numbered menu and return the zero-based index chosen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input.
    pub fn choose(&mut self, title: &str, options: &[&str]) -> Result<usize> {
        self.say("")?;
        self.say(format_args!("=== {title} ==="))?;
        for (n, option) in options.iter().enumerate() {
            self.say(format_args!("{}. {option}", n + 1))?;
        }
        let count = options.len();
        self.prompt_with("Choice", |s| match s.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
            _ => Err(format!("choose a number from 1 to {count}")),
        })
    }

    /// Print flights as a table, or a notice when there are none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the output cannot be written.
    pub fn show_flights(&mut self, flights: &[&Flight], currency: &str) -> Result<()> {
        if flights.is_empty() {
            return self.say("No flights found.");
        }
        write_flight_table(&mut self.output, flights, currency)?;
        Ok(())
    }

    /// Turn a failed operation into a printed message.
    ///
    /// Console I/O failures and end of input are passed on; every other
    /// error is printed and yields `None` so the menu can continue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] and [`Error::Io`] unchanged.
    pub fn report<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e @ (Error::InputClosed | Error::Io(_))) => Err(e),
            Err(e) => {
                if !e.is_user_error() {
                    error!(error = %e, "Operation failed");
                }
                self.say(format_args!("Error: {e}"))?;
                Ok(None)
            }
        }
    }
}

/// Which screen the session shows next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Register, login or exit.
    Main,
    /// Flight search and booking.
    Passenger,
    /// Schedule maintenance.
    Staff,
    /// User maintenance and booking audit.
    Admin,
    /// End of session.
    Exit,
}

impl Screen {
    /// The home screen for a signed-in role.
    #[must_use]
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Passenger => Self::Passenger,
            Role::Staff => Self::Staff,
            Role::Admin => Self::Admin,
        }
    }
}

const ROLE_OPTIONS: [&str; 3] = ["Passenger", "Airline Staff", "Admin"];

const MAIN_MENU: [&str; 3] = ["Register", "Login", "Exit"];

const PASSENGER_MENU: [&str; 7] = [
    "View all flights",
    "Search flights",
    "Book a flight",
    "My bookings",
    "Pay outstanding bookings",
    "Logout",
    "Exit",
];

const STAFF_MENU: [&str; 7] = [
    "View all flights",
    "Add a flight",
    "Update a flight",
    "Remove a flight",
    "View flight manifest",
    "Logout",
    "Exit",
];

const ADMIN_MENU: [&str; 6] = [
    "Add a user",
    "Remove a user",
    "List users",
    "View all bookings",
    "Logout",
    "Exit",
];

/// One interactive session at the desk.
#[derive(Debug)]
pub struct Session<'d, R, W> {
    desk: &'d mut Desk,
    console: Console<R, W>,
    user: Option<User>,
    // Bookings made since the current user signed in.
    booked: Vec<BookingId>,
}

impl<'d, R: BufRead, W: Write> Session<'d, R, W> {
    /// Start a session with nobody signed in.
    pub fn new(desk: &'d mut Desk, console: Console<R, W>) -> Self {
        Self {
            desk,
            console,
            user: None,
            booked: Vec::new(),
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// End the session and give back the console.
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Show screens until the user exits or input ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the console cannot be read or written.
    pub fn run(&mut self) -> Result<()> {
        let mut screen = Screen::Main;
        while screen != Screen::Exit {
            screen = match self.step(screen) {
                Ok(next) => next,
                Err(Error::InputClosed) => {
                    debug!("Console input closed");
                    Screen::Exit
                }
                Err(e) => return Err(e),
            };
        }
        self.console.say(format_args!(
            "Thank you for flying with {}.",
            self.desk.airline_name()
        ))
    }

    /// Show one screen, handle one choice, and return the next screen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputClosed`] at end of input and [`Error::Io`] if
    /// the console fails. Domain errors are printed, not returned.
    pub fn step(&mut self, screen: Screen) -> Result<Screen> {
        match screen {
            Screen::Main => self.main_menu(),
            Screen::Passenger => self.passenger_menu(),
            Screen::Staff => self.staff_menu(),
            Screen::Admin => self.admin_menu(),
            Screen::Exit => Ok(Screen::Exit),
        }
    }

    // === Main screen ===

    fn main_menu(&mut self) -> Result<Screen> {
        let title = format!("Welcome to {}", self.desk.airline_name());
        match self.console.choose(&title, &MAIN_MENU)? {
            0 => {
                self.register()?;
                Ok(Screen::Main)
            }
            1 => self.login(),
            _ => Ok(Screen::Exit),
        }
    }

    fn register(&mut self) -> Result<()> {
        let new_user = self.user_form()?;
        let access_key = if new_user.role.is_privileged() {
            Some(self.console.prompt_line("Access key")?)
        } else {
            None
        };
        if let Some(user) = self
            .console
            .report(self.desk.register(new_user, access_key.as_deref()))?
        {
            self.console
                .say(format_args!("Registered {} as {}.", user.name, user.role))?;
        }
        Ok(())
    }

    fn login(&mut self) -> Result<Screen> {
        let email = self.console.prompt_line("Email")?;
        let password = self.console.prompt_line("Password")?;
        let Some(user) = self.console.report(self.desk.login(&email, &password))? else {
            return Ok(Screen::Main);
        };
        let user = user.clone();
        self.console
            .say(format_args!("Welcome, {} ({}).", user.name, user.role))?;
        let next = Screen::for_role(user.role);
        self.user = Some(user);
        self.booked.clear();
        Ok(next)
    }

    fn logout(&mut self) -> Result<Screen> {
        if let Some(user) = self.user.take() {
            info!(email = %user.email, "Signed out");
            self.console.say(format_args!("Goodbye, {}.", user.name))?;
        }
        self.booked.clear();
        Ok(Screen::Main)
    }

    fn user_form(&mut self) -> Result<NewUser> {
        let name = self.console.prompt_with("Full name", not_blank)?;
        let email = self.console.prompt_validated("Email", validate_email)?;
        let policy = self.desk.users().policy();
        let password = self
            .console
            .prompt_validated("Password", |p| policy.validate(p))?;
        let role = Role::ALL[self.console.choose("Role", &ROLE_OPTIONS)?];
        Ok(NewUser {
            name,
            email,
            password,
            role,
        })
    }

    // === Passenger screen ===

    fn passenger_menu(&mut self) -> Result<Screen> {
        match self.console.choose("Passenger menu", &PASSENGER_MENU)? {
            0 => self.list_flights()?,
            1 => self.search_flights()?,
            2 => self.book_flight()?,
            3 => self.my_bookings()?,
            4 => self.pay_outstanding()?,
            5 => return self.logout(),
            _ => return Ok(Screen::Exit),
        }
        Ok(Screen::Passenger)
    }

    fn list_flights(&mut self) -> Result<()> {
        let flights: Vec<&Flight> = self.desk.flights().iter().collect();
        self.console.show_flights(&flights, self.desk.currency())
    }

    fn search_flights(&mut self) -> Result<()> {
        let origin = self.console.prompt_optional("Origin (blank for any)")?;
        let destination = self.console.prompt_optional("Destination (blank for any)")?;
        let date = self
            .console
            .prompt_with("Date YYYY-MM-DD (blank for any)", |s| {
                if s.is_empty() {
                    Ok(None)
                } else {
                    parse_date(s).map(Some)
                }
            })?;
        let query = FlightQuery {
            origin,
            destination,
            date,
        };
        let found = self.desk.search(&query);
        self.console.show_flights(&found, self.desk.currency())
    }

    fn book_flight(&mut self) -> Result<()> {
        let id: FlightId = self.console.prompt_parse("Flight id")?;
        let Some(flight) = self.console.report(find_flight(self.desk, id))? else {
            return Ok(());
        };
        self.console.say(flight)?;
        let (fare, available) = (flight.fare, flight.available_seats);
        if available == 0 {
            return self.console.say(format_args!("Flight {id} is full."));
        }

        let count = self.console.prompt_with("Number of passengers", |s| {
            match s.parse::<u32>() {
                Ok(n) if (1..=available).contains(&n) => Ok(n),
                _ => Err(format!("enter a number from 1 to {available}")),
            }
        })?;
        let mut names = Vec::new();
        for n in 1..=count {
            names.push(
                self.console
                    .prompt_with(&format!("Passenger {n} name"), not_blank)?,
            );
        }

        let total = fare * Decimal::from(count);
        let question = format!(
            "Book {count} seat(s) on flight {id} for {total} {}?",
            self.desk.currency()
        );
        if !self.console.confirm(&question)? {
            return self.console.say("Booking cancelled.");
        }
        let Some(ids) = self.console.report(self.desk.book(id, &names))? else {
            return Ok(());
        };
        self.booked.extend(ids.iter().copied());
        self.console
            .say(format_args!("Booked. Booking ids: {}", join_ids(&ids)))?;

        if self.console.confirm("Pay now?")? {
            self.pay(&ids)
        } else {
            self.console
                .say("You can pay later from the passenger menu.")
        }
    }

    fn my_bookings(&mut self) -> Result<()> {
        let bookings: Vec<&Booking> = self
            .booked
            .iter()
            .filter_map(|id| self.desk.ledger().get(*id))
            .collect();
        if bookings.is_empty() {
            return self.console.say("You have no bookings yet.");
        }
        for booking in bookings {
            self.console.say(booking)?;
        }
        Ok(())
    }

    fn pay_outstanding(&mut self) -> Result<()> {
        let unpaid: Vec<BookingId> = self
            .booked
            .iter()
            .copied()
            .filter(|id| self.desk.ledger().get(*id).is_some_and(|b| !b.is_paid()))
            .collect();
        if unpaid.is_empty() {
            return self.console.say("Nothing to pay.");
        }
        let due: Decimal = unpaid
            .iter()
            .filter_map(|id| self.desk.ledger().get(*id))
            .map(|b| b.fare)
            .sum();
        let question = format!(
            "Pay {due} {} for bookings {}?",
            self.desk.currency(),
            join_ids(&unpaid)
        );
        if self.console.confirm(&question)? {
            self.pay(&unpaid)
        } else {
            Ok(())
        }
    }

    fn pay(&mut self, ids: &[BookingId]) -> Result<()> {
        let details = self.payment_form()?;
        let payer = details.cardholder.clone();
        if let Some(receipt) = self.console.report(self.desk.pay(ids, &details, &payer))? {
            self.console.say(format_args!(
                "Payment of {} {} accepted for {} booking(s), card ending {}.",
                receipt.total,
                self.desk.currency(),
                receipt.bookings.len(),
                receipt.card_last4
            ))?;
        }
        Ok(())
    }

    fn payment_form(&mut self) -> Result<PaymentDetails> {
        let bank = self.console.prompt_with("Bank", not_blank)?;
        let cardholder = self.console.prompt_with("Cardholder name", not_blank)?;
        let card_number = self.console.prompt_with("Card number (16 digits)", |s| {
            let digits = normalize_card_number(s);
            validate_card_number(&digits)
                .map(|()| digits)
                .map_err(|e| e.to_string())
        })?;
        let expiry = self
            .console
            .prompt_validated("Expiry (MM/YY)", validate_expiry)?;
        let cvv = self.console.prompt_validated("CVV", validate_cvv)?;
        Ok(PaymentDetails {
            bank,
            cardholder,
            card_number,
            expiry,
            cvv,
        })
    }

    // === Staff screen ===

    fn staff_menu(&mut self) -> Result<Screen> {
        match self.console.choose("Staff menu", &STAFF_MENU)? {
            0 => self.list_flights()?,
            1 => self.add_flight()?,
            2 => self.update_flight()?,
            3 => self.remove_flight()?,
            4 => self.show_manifest()?,
            5 => return self.logout(),
            _ => return Ok(Screen::Exit),
        }
        Ok(Screen::Staff)
    }

    fn add_flight(&mut self) -> Result<()> {
        let origin = self.console.prompt_with("Origin", not_blank)?;
        let destination = self.console.prompt_with("Destination", not_blank)?;
        let date = self.console.prompt_with("Date (YYYY-MM-DD)", parse_date)?;
        let time = self.console.prompt_with("Departure time (HH:MM)", parse_time)?;
        let fare = self.console.prompt_with("Fare", parse_fare)?;
        let seats: u32 = self.console.prompt_parse("Seats")?;
        let flight = NewFlight {
            origin,
            destination,
            date,
            time,
            fare,
            seats,
        };
        if let Some(id) = self.console.report(self.desk.add_flight(flight))? {
            self.console.say(format_args!("Flight {id} scheduled."))?;
        }
        Ok(())
    }

    fn update_flight(&mut self) -> Result<()> {
        let id: FlightId = self.console.prompt_parse("Flight id")?;
        let Some(current) = self
            .console
            .report(find_flight(self.desk, id).cloned())?
        else {
            return Ok(());
        };
        self.console.say(&current)?;
        self.console.say("Leave a field blank to keep its value.")?;

        let date = self.console.prompt_or(
            &format!("Date [{}]", current.date.format(DATE_FORMAT)),
            current.date,
            parse_date,
        )?;
        let time = self.console.prompt_or(
            &format!("Departure time [{}]", current.time.format(TIME_FORMAT)),
            current.time,
            parse_time,
        )?;
        let fare = self
            .console
            .prompt_or(&format!("Fare [{}]", current.fare), current.fare, parse_fare)?;
        let available_seats = self.console.prompt_or(
            &format!("Available seats [{}]", current.available_seats),
            current.available_seats,
            |s| s.parse::<u32>().map_err(|e| e.to_string()),
        )?;

        let update = FlightUpdate {
            date: Some(date),
            time,
            fare,
            available_seats,
        };
        if let Some(flight) = self.console.report(self.desk.update_flight(id, update))? {
            self.console.say(format_args!("Updated: {flight}"))?;
        }
        Ok(())
    }

    fn remove_flight(&mut self) -> Result<()> {
        let id: FlightId = self.console.prompt_parse("Flight id")?;
        if !self.console.confirm(&format!("Remove flight {id}?"))? {
            return Ok(());
        }
        if let Some(flight) = self.console.report(self.desk.remove_flight(id))? {
            self.console.say(format_args!(
                "Removed flight {} ({} -> {}).",
                flight.id, flight.origin, flight.destination
            ))?;
        }
        Ok(())
    }

    fn show_manifest(&mut self) -> Result<()> {
        let id: FlightId = self.console.prompt_parse("Flight id")?;
        let bookings = self.desk.manifest(id);
        if bookings.is_empty() {
            return self.console.say(format_args!("No bookings on flight {id}."));
        }
        for booking in bookings {
            self.console.say(booking)?;
        }
        Ok(())
    }

    // === Admin screen ===

    fn admin_menu(&mut self) -> Result<Screen> {
        match self.console.choose("Admin menu", &ADMIN_MENU)? {
            0 => self.add_user()?,
            1 => self.remove_user()?,
            2 => self.list_users()?,
            3 => self.audit_bookings()?,
            4 => return self.logout(),
            _ => return Ok(Screen::Exit),
        }
        Ok(Screen::Admin)
    }

    fn add_user(&mut self) -> Result<()> {
        let new_user = self.user_form()?;
        if let Some(user) = self.console.report(self.desk.add_user(new_user))? {
            self.console
                .say(format_args!("Added {} as {}.", user.email, user.role))?;
        }
        Ok(())
    }

    fn remove_user(&mut self) -> Result<()> {
        let email = self.console.prompt_line("Email of user to remove")?;
        let is_self = self
            .user
            .as_ref()
            .is_some_and(|u| u.email.eq_ignore_ascii_case(email.trim()));
        if is_self {
            return self
                .console
                .say("You cannot remove the account you are signed in with.");
        }
        if let Some(user) = self.console.report(self.desk.remove_user(&email))? {
            self.console.say(format_args!("Removed {}.", user.email))?;
        }
        Ok(())
    }

    fn list_users(&mut self) -> Result<()> {
        let users = self.desk.users().users();
        if users.is_empty() {
            return self.console.say("No users registered.");
        }
        for user in users {
            self.console.say(format_args!(
                "{:<30} {:<24} {}",
                user.email, user.name, user.role
            ))?;
        }
        Ok(())
    }

    fn audit_bookings(&mut self) -> Result<()> {
        let ledger = self.desk.ledger();
        if ledger.is_empty() {
            return self.console.say("No bookings yet.");
        }
        for booking in ledger {
            self.console.say(booking)?;
        }
        let paid = ledger.iter().filter(|b| b.is_paid()).count();
        let outstanding: Decimal = ledger.outstanding().map(|b| b.fare).sum();
        let currency = self.desk.currency();
        self.console.say(format_args!(
            "{} booking(s), {paid} paid. Total paid: {} {currency}. Outstanding: {outstanding} {currency}.",
            ledger.len(),
            ledger.total_paid()
        ))
    }
}

fn find_flight(desk: &Desk, id: FlightId) -> Result<&Flight> {
    desk.flights().get(id).ok_or(Error::FlightNotFound { id })
}

fn not_blank(s: &str) -> std::result::Result<String, String> {
    if s.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| "expected YYYY-MM-DD".to_string())
}

fn parse_time(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|_| "expected HH:MM".to_string())
}

fn parse_fare(s: &str) -> std::result::Result<Decimal, String> {
    let fare: Decimal = s.parse().map_err(|_| "expected an amount".to_string())?;
    if fare.is_sign_negative() && !fare.is_zero() {
        return Err("fare must not be negative".to_string());
    }
    Ok(fare)
}

fn join_ids(ids: &[BookingId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
