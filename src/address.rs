use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@<>,;]+@[^\s@<>,;]+\.[^\s@<>,;]+$").unwrap());

static NAMED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[^<]*)<(?P<email>[^<>]*)>$").unwrap());

/// A mail recipient as typed into an address field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub email: String,
}

impl Address {
    pub fn new(name: Option<&str>, email: &str) -> Self {
        Address {
            name: name.map(str::to_string),
            email: email.to_string(),
        }
    }

    /// The name, or the address when there is none
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {entry:?}")]
pub struct AddressParseError {
    pub entry: String,
}

/// Parse a comma or semicolon separated recipient list
pub fn parse_addresses(input: &str) -> Result<Vec<Address>, AddressParseError> {
    let mut addresses = Vec::new();
    for entry in split_entries(input) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        addresses.push(parse_entry(entry)?);
    }
    Ok(addresses)
}

fn parse_entry(entry: &str) -> Result<Address, AddressParseError> {
    let invalid = || AddressParseError {
        entry: entry.to_string(),
    };

    if let Some(caps) = NAMED_RE.captures(entry) {
        let email = caps.name("email").map_or("", |m| m.as_str()).trim();
        if !EMAIL_RE.is_match(email) {
            return Err(invalid());
        }
        let name = caps
            .name("name")
            .map(|m| m.as_str().trim().trim_matches('"').trim())
            .filter(|name| !name.is_empty());
        return Ok(Address::new(name, email));
    }

    if EMAIL_RE.is_match(entry) {
        Ok(Address::new(None, entry))
    } else {
        Err(invalid())
    }
}

/// Split on separators outside of quoted display names
fn split_entries(input: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' | ';' if !quoted => {
                entries.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    entries.push(&input[start..]);
    entries
}
