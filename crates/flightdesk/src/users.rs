//! Credential store for flightdesk.
//!
//! Users are kept in memory, keyed by lowercase email, and mirrored to a flat
//! `users.txt` file with one whitespace-delimited line per user:
//!
//! ```text
//! email encodedPassword name... role
//! ```
//!
//! The password encoding shifts every character up by one code point. It is
//! trivially reversible and provides no confidentiality whatsoever; it only
//! keeps passwords from being readable at a glance.
//!
//! The file is read once when the store is opened and rewritten in full after
//! every change.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
    })
}

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Searches and books flights.
    Passenger,
    /// Maintains the flight schedule.
    Staff,
    /// Maintains users and audits bookings.
    Admin,
}

impl Role {
    /// All roles, in menu order.
    pub const ALL: [Role; 3] = [Role::Passenger, Role::Staff, Role::Admin];

    /// Check whether registering with this role needs an access key.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        !matches!(self, Self::Passenger)
    }

    /// Spelling used in the users file.
    fn file_token(self) -> &'static str {
        match self {
            Self::Passenger => "Passenger",
            Self::Staff => "Airline Staff",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passenger => write!(f, "Passenger"),
            Self::Staff => write!(f, "Staff"),
            Self::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "passenger" => Ok(Self::Passenger),
            "staff" | "airline staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Login email, lowercase.
    pub email: String,
    /// Shift-encoded password.
    #[serde(skip_serializing)]
    encoded_password: String,
    /// Display name.
    pub name: String,
    /// Role chosen at registration.
    pub role: Role,
}

impl User {
    /// Check a plaintext password against the stored encoding.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        encode_password(password) == self.encoded_password
    }

    fn to_line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.email,
            self.encoded_password,
            self.name,
            self.role.file_token()
        )
    }
}

/// Registration form.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Requested role.
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Password rules applied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// Check a password against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeakPassword`] naming the first rule broken.
    pub fn validate(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_length {
            return Err(Error::weak_password(format!(
                "must be at least {} characters",
                self.min_length
            )));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(Error::weak_password("must include a number"));
        }
        // The users file is whitespace-delimited, before and after encoding.
        let unsafe_char = |c: char| c.is_whitespace() || c.is_control();
        if password.chars().any(unsafe_char) || encode_password(password).chars().any(unsafe_char)
        {
            return Err(Error::weak_password(
                "must not contain spaces or control characters",
            ));
        }
        Ok(())
    }
}

/// Check an email address against the accepted format.
///
/// # Errors
///
/// Returns [`Error::InvalidEmail`] if it does not match.
pub fn validate_email(email: &str) -> Result<()> {
    if email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(Error::InvalidEmail {
            email: email.to_string(),
        })
    }
}

/// Shift every character up by one code point.
///
/// Characters with no valid successor are kept as they are.
#[must_use]
pub fn encode_password(password: &str) -> String {
    password
        .chars()
        .map(|c| char::from_u32(u32::from(c) + 1).unwrap_or(c))
        .collect()
}

/// Collapse runs of whitespace so a name survives the line format.
fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse one line of the users file.
fn parse_line(line: &str) -> Option<User> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [email, encoded_password, rest @ ..] = fields.as_slice() else {
        return None;
    };
    if rest.is_empty() {
        return None;
    }

    let (name, role) = match rest {
        [name @ .., first, second]
            if !name.is_empty() && format!("{first} {second}").parse::<Role>().is_ok() =>
        {
            (name, Role::Staff)
        }
        [name @ .., last] if !name.is_empty() => match last.parse::<Role>() {
            Ok(role) => (name, role),
            Err(_) => (rest, Role::Passenger),
        },
        _ => (rest, Role::Passenger),
    };

    Some(User {
        email: email.to_ascii_lowercase(),
        encoded_password: (*encoded_password).to_string(),
        name: name.join(" "),
        role,
    })
}

/// In-memory user table backed by a flat file.
#[derive(Debug)]
pub struct UserStore {
    path: Option<PathBuf>,
    users: HashMap<String, User>,
    policy: PasswordPolicy,
}

impl UserStore {
    /// Load the users file at `path`. A missing file gives an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UsersFile`] if the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>, policy: PasswordPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut users = HashMap::new();

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for (number, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_line(line) {
                        Some(user) => {
                            users.insert(user.email.clone(), user);
                        }
                        None => warn!(
                            path = %path.display(),
                            line = number + 1,
                            "Skipping malformed users file line"
                        ),
                    }
                }
                info!(path = %path.display(), users = users.len(), "Users loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No users file yet");
            }
            Err(source) => return Err(Error::UsersFile { path, source }),
        }

        Ok(Self {
            path: Some(path),
            users,
            policy,
        })
    }

    /// Create a store that is never written to disk.
    #[must_use]
    pub fn in_memory(policy: PasswordPolicy) -> Self {
        Self {
            path: None,
            users: HashMap::new(),
            policy,
        }
    }

    /// The password policy applied at registration.
    #[must_use]
    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Register a new user and persist the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`], [`Error::InvalidEmail`] or
    /// [`Error::WeakPassword`] for bad input,
    /// [`Error::DuplicateUser`] if the email is taken, or an I/O error if the
    /// file cannot be written (the user is then not kept).
    pub fn register(&mut self, new_user: NewUser) -> Result<&User> {
        let name = normalize_name(&new_user.name);
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        let email = new_user.email.trim().to_ascii_lowercase();
        validate_email(&email)?;
        self.policy.validate(&new_user.password)?;
        if self.users.contains_key(&email) {
            return Err(Error::DuplicateUser { email });
        }

        let user = User {
            email: email.clone(),
            encoded_password: encode_password(&new_user.password),
            name,
            role: new_user.role,
        };
        self.users.insert(email.clone(), user);
        if let Err(e) = self.save() {
            self.users.remove(&email);
            return Err(e);
        }

        info!(email = %email, role = %new_user.role, "User registered");
        self.users
            .get(&email)
            .ok_or_else(|| Error::internal("registered user missing"))
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] for an unknown email or a wrong
    /// password alike.
    pub fn login(&self, email: &str, password: &str) -> Result<&User> {
        let email = email.trim().to_ascii_lowercase();
        match self.users.get(&email) {
            Some(user) if user.verify_password(password) => {
                info!(email = %email, role = %user.role, "Login succeeded");
                Ok(user)
            }
            _ => {
                warn!(email = %email, "Login failed");
                Err(Error::InvalidCredentials)
            }
        }
    }

    /// Remove a user and persist the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] for an unknown email, or an I/O error
    /// if the file cannot be written (the user is then kept).
    pub fn remove(&mut self, email: &str) -> Result<User> {
        let email = email.trim().to_ascii_lowercase();
        let user = self
            .users
            .remove(&email)
            .ok_or_else(|| Error::UserNotFound {
                email: email.clone(),
            })?;
        if let Err(e) = self.save() {
            self.users.insert(email, user);
            return Err(e);
        }
        info!(email = %email, "User removed");
        Ok(user)
    }

    /// Look up a user by email.
    #[must_use]
    pub fn get(&self, email: &str) -> Option<&User> {
        self.users.get(&email.trim().to_ascii_lowercase())
    }

    /// All users, sorted by email.
    #[must_use]
    pub fn users(&self) -> Vec<&User> {
        let mut users: Vec<_> = self.users.values().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check whether no users are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Rewrite the users file: write a sibling temp file, then rename it over.
    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut contents = String::new();
        for user in self.users() {
            contents.push_str(&user.to_line());
            contents.push('\n');
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        let to_error = |source| Error::UsersFile {
            path: path.clone(),
            source,
        };
        fs::write(&tmp, contents).map_err(to_error)?;
        fs::rename(&tmp, path).map_err(to_error)?;

        debug!(path = %path.display(), users = self.users.len(), "Users file written");
        Ok(())
    }
}
