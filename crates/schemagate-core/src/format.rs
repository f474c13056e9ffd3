//! String formats recognized by the `format` keyword.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

static HOSTNAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
        .expect("hostname label pattern compiles")
});

/// A named string format. Unknown format names are rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Email,
    Date,
    DateTime,
    Time,
    Uri,
    Uuid,
    Ipv4,
    Ipv6,
    Hostname,
}

impl Format {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            "date" => Some(Self::Date),
            "date-time" => Some(Self::DateTime),
            "time" => Some(Self::Time),
            "uri" => Some(Self::Uri),
            "uuid" => Some(Self::Uuid),
            "ipv4" => Some(Self::Ipv4),
            "ipv6" => Some(Self::Ipv6),
            "hostname" => Some(Self::Hostname),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Time => "time",
            Self::Uri => "uri",
            Self::Uuid => "uuid",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Hostname => "hostname",
        }
    }

    pub fn is_valid(self, value: &str) -> bool {
        match self {
            Self::Email => EMAIL.is_match(value),
            Self::Date => {
                value.len() == 10 && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
            // RFC 3339 full-time: reuse the date-time parser with a fixed date.
            Self::Time => {
                chrono::DateTime::parse_from_rfc3339(&format!("1970-01-01T{value}")).is_ok()
            }
            Self::Uri => url::Url::parse(value).is_ok(),
            Self::Uuid => value.len() == 36 && uuid::Uuid::try_parse(value).is_ok(),
            Self::Ipv4 => value.parse::<Ipv4Addr>().is_ok(),
            Self::Ipv6 => value.parse::<Ipv6Addr>().is_ok(),
            Self::Hostname => is_hostname(value),
        }
    }
}

fn is_hostname(value: &str) -> bool {
    let trimmed = value.strip_suffix('.').unwrap_or(value);
    !trimmed.is_empty()
        && trimmed.len() <= 253
        && trimmed
            .split('.')
            .all(|label| HOSTNAME_LABEL.is_match(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for name in [
            "email",
            "date",
            "date-time",
            "time",
            "uri",
            "uuid",
            "ipv4",
            "ipv6",
            "hostname",
        ] {
            assert_eq!(Format::parse(name).map(Format::as_str), Some(name));
        }
        assert_eq!(Format::parse("credit-card"), None);
    }

    #[test]
    fn email() {
        assert!(Format::Email.is_valid("a@b.com"));
        assert!(Format::Email.is_valid("first.last+tag@example.co.uk"));
        assert!(!Format::Email.is_valid("Bob"));
        assert!(!Format::Email.is_valid("a@@b.com"));
        assert!(!Format::Email.is_valid("a b@c.com"));
    }

    #[test]
    fn dates_and_times() {
        assert!(Format::Date.is_valid("2024-02-29"));
        assert!(!Format::Date.is_valid("2023-02-29"));
        assert!(!Format::Date.is_valid("2024-2-9"));
        assert!(Format::DateTime.is_valid("2024-01-15T10:30:00Z"));
        assert!(Format::DateTime.is_valid("2024-01-15T10:30:00.5+02:00"));
        assert!(!Format::DateTime.is_valid("2024-01-15 10:30"));
        assert!(Format::Time.is_valid("10:30:00Z"));
        assert!(!Format::Time.is_valid("25:00:00Z"));
    }

    #[test]
    fn network_formats() {
        assert!(Format::Ipv4.is_valid("192.168.0.1"));
        assert!(!Format::Ipv4.is_valid("256.0.0.1"));
        assert!(Format::Ipv6.is_valid("::1"));
        assert!(!Format::Ipv6.is_valid("192.168.0.1"));
        assert!(Format::Hostname.is_valid("api.example.com"));
        assert!(!Format::Hostname.is_valid("-bad.example.com"));
        assert!(!Format::Hostname.is_valid(""));
        assert!(Format::Uri.is_valid("https://example.com/a?b=c"));
        assert!(!Format::Uri.is_valid("not a uri"));
    }

    #[test]
    fn uuid_requires_hyphenated_form() {
        assert!(Format::Uuid.is_valid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!Format::Uuid.is_valid("67e5504410b1426f9247bb680e5fe0c8"));
    }
}
