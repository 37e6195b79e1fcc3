use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crm::submission::SubmissionError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContactEmail(String);

impl ContactEmail {
    /// Accepts `local@domain.tld` shapes: no whitespace, a non-empty local part and a
    /// dotted domain with text on both sides of some dot.
    pub fn parse(raw: &str) -> Result<Self, SubmissionError> {
        let candidate = raw.trim();
        if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
            return Err(SubmissionError::InvalidEmail(raw.to_string()));
        }

        let valid = candidate.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.char_indices().any(|(index, ch)| {
                    ch == '.' && index > 0 && index + ch.len_utf8() < domain.len()
                })
        });

        if valid {
            Ok(Self(candidate.to_string()))
        } else {
            Err(SubmissionError::InvalidEmail(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContactEmail {
    type Error = SubmissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContactEmail> for String {
    fn from(value: ContactEmail) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::ContactEmail;

    #[test]
    fn accepts_plain_addresses() {
        for raw in ["jane@acme.com", "a@b.co", "first.last+quotes@sub.example.org", " ops@acme.io "] {
            assert!(ContactEmail::parse(raw).is_ok(), "{raw} should be accepted");
        }
        assert_eq!(ContactEmail::parse(" ops@acme.io ").expect("email").as_str(), "ops@acme.io");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "jane", "jane@acme", "@acme.com", "jane@.com", "jane@acme.", "jane doe@acme.com"] {
            assert!(ContactEmail::parse(raw).is_err(), "{raw} should be rejected");
        }
    }
}
