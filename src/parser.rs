use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use crate::error::{Result, TrieError};

/// Pattern for a valid lowercased hostname: dot-separated runs of ASCII
/// letters, digits, hyphens and underscores.
static HOSTNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-z_-]+(\.[0-9a-z_-]+)*$")
        .expect("HOSTNAME_PATTERN: hardcoded regex is invalid")
});

/// Longest hostname the trie stores; anything longer is rejected here
/// rather than silently truncated at the needle.
pub const MAX_HOSTNAME_LEN: usize = 254;

/// Parse hostnames from blocklist text.
///
/// The format is line oriented: `#` starts a comment, blank lines are
/// skipped, and `/etc/hosts`-style lines are accepted (a first token that
/// parses as an IP address is treated as the redirect address, every
/// following token as a hostname). Hostnames are lowercased and validated.
///
/// # Errors
///
/// [`TrieError::ParseErrorAtLine`] when a line carries no hostname or an
/// invalid one.
pub fn parse_hosts(text: &str) -> Result<Vec<String>> {
    let mut hostnames = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1; // 1-based line numbers

        // Remove comments and trim whitespace
        let line = if let Some(comment_pos) = line.find('#') {
            &line[..comment_pos]
        } else {
            line
        };
        let line = line.trim();

        // Skip empty lines
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace().peekable();

        // hosts-file form: "0.0.0.0 ads.example.com tracker.example.com"
        let mut saw_address = false;
        if let Some(first) = tokens.peek() {
            if first.parse::<IpAddr>().is_ok() {
                tokens.next();
                saw_address = true;
            }
        }

        let mut count = 0;
        for token in tokens {
            let hostname = token.to_lowercase();
            validate_hostname(&hostname).map_err(|e| TrieError::ParseErrorAtLine {
                line: line_num,
                message: e.to_string(),
            })?;
            hostnames.push(hostname);
            count += 1;
        }
        if count == 0 {
            let message = if saw_address {
                "address without hostname".to_string()
            } else {
                format!("no hostname on line: {line}")
            };
            return Err(TrieError::ParseErrorAtLine {
                line: line_num,
                message,
            });
        }
    }

    Ok(hostnames)
}

/// Parse hostnames from a blocklist file.
pub fn parse_hosts_from_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_hosts(&text)
}

/// Check that a lowercased hostname is storable: non-empty, at most 254
/// bytes, and made of valid labels.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty()
        || hostname.len() > MAX_HOSTNAME_LEN
        || !HOSTNAME_PATTERN.is_match(hostname)
    {
        return Err(TrieError::InvalidHostname(hostname.to_string()));
    }
    Ok(())
}
