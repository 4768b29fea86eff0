//! Address and name syntax checks
//!
//! Parsing never rejects a line; these predicates are applied only when a
//! caller adds entries through the store.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

/// Labels of up to 63 characters, dot separated, optional trailing `.` or `_`
static DNS_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z0-9_][a-zA-Z0-9_-]{0,62})(\.[a-zA-Z0-9_][a-zA-Z0-9_-]{0,62})*[._]?$")
        .expect("DNS name pattern is valid")
});

const MAX_NAME_LEN: usize = 255;

/// Check IPv4/IPv6 textual syntax
pub fn is_valid_address(address: &str) -> bool {
    address.parse::<IpAddr>().is_ok()
}

/// Check that `name` is usable as a hostname or alias
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.chars().filter(|c| *c != '.').count() > MAX_NAME_LEN {
        return false;
    }
    !is_valid_address(name) && DNS_NAME.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        assert!(is_valid_address("127.0.0.1"));
        assert!(is_valid_address("::1"));
        assert!(is_valid_address("fe00::0"));
        assert!(is_valid_address("255.255.255.255"));

        assert!(!is_valid_address("badip"));
        assert!(!is_valid_address("127.x.x.1"));
        assert!(!is_valid_address("[::1"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_names() {
        assert!(is_valid_name("localhost"));
        assert!(is_valid_name("host.docker.internal"));
        assert!(is_valid_name("a1.ddev.site"));
        assert!(is_valid_name("_service.example"));
        assert!(is_valid_name("trailing.dot."));

        assert!(!is_valid_name(""));
        assert!(!is_valid_name("host1%"));
        assert!(!is_valid_name("invalid hostname"));
        assert!(!is_valid_name(".invalid*hostname"));
        assert!(!is_valid_name("-leading.dash"));
        assert!(!is_valid_name("10.0.0.1"));
    }

    #[test]
    fn test_name_length_limits() {
        let label = "a".repeat(63);
        assert!(is_valid_name(&label));
        assert!(!is_valid_name(&"a".repeat(64)));

        let long = vec![label.as_str(); 5].join(".");
        assert!(!is_valid_name(&long));
    }
}
