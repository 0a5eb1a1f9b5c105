//! Ownership proof.
//!
//! A miner may only claim content whose author embeds the miner's ledger key
//! in their profile description. The description must carry exactly one
//! address-like token, and it must be the miner's key.

use std::sync::OnceLock;

use regex::Regex;

/// Base58 ledger addresses are 47 or 48 characters.
const ADDRESS_PATTERN: &str = r"\b[1-9A-HJ-NP-Za-km-z]{47,48}\b";

static ADDRESS_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// Why an ownership proof failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    #[error("no address in author description")]
    NoAddress,

    #[error("{0} distinct addresses in author description")]
    MultipleAddresses(usize),

    #[error("address in author description does not match miner key")]
    KeyMismatch,
}

/// Distinct address-like tokens in `text`, compared case-insensitively, in
/// order of first appearance.
pub fn extract_addresses(text: &str) -> Vec<String> {
    let Some(re) = ADDRESS_REGEX
        .get_or_init(|| Regex::new(ADDRESS_PATTERN).ok())
        .as_ref()
    else {
        return Vec::new();
    };

    let mut seen: Vec<String> = Vec::new();
    for token in re.find_iter(text).map(|m| m.as_str()) {
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(token)) {
            seen.push(token.to_string());
        }
    }
    seen
}

/// Check that `description` proves ownership by `ledger_key`.
pub fn verify_ownership(description: &str, ledger_key: &str) -> Result<(), OwnershipError> {
    let addresses = extract_addresses(description);

    match addresses.as_slice() {
        [] => Err(OwnershipError::NoAddress),
        [only] if only.trim().eq_ignore_ascii_case(ledger_key.trim()) => Ok(()),
        [_] => Err(OwnershipError::KeyMismatch),
        many => Err(OwnershipError::MultipleAddresses(many.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const OTHER: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

    #[test]
    fn test_single_matching_address() {
        let description = format!("my address is {} some text", KEY);
        assert_eq!(verify_ownership(&description, KEY), Ok(()));
    }

    #[test]
    fn test_key_comparison_ignores_case_and_whitespace() {
        let description = format!("vouching as {}", KEY.to_lowercase());
        assert_eq!(verify_ownership(&description, &format!("  {} ", KEY)), Ok(()));
    }

    #[test]
    fn test_repeated_address_counts_once() {
        let description = format!("{} | tips: {}", KEY, KEY);
        assert_eq!(verify_ownership(&description, KEY), Ok(()));
    }

    #[test]
    fn test_two_addresses_fail_even_when_one_matches() {
        let description = format!("{} and {}", KEY, OTHER);
        assert_eq!(
            verify_ownership(&description, KEY),
            Err(OwnershipError::MultipleAddresses(2))
        );
    }

    #[test]
    fn test_no_address() {
        assert_eq!(
            verify_ownership("just a regular bio", KEY),
            Err(OwnershipError::NoAddress)
        );
    }

    #[test]
    fn test_wrong_address() {
        let description = format!("my address is {}", OTHER);
        assert_eq!(verify_ownership(&description, KEY), Err(OwnershipError::KeyMismatch));
    }

    #[test]
    fn test_short_tokens_ignored() {
        // 46 characters, too short to be an address
        let description = format!("{} {}", &KEY[..46], KEY);
        assert_eq!(extract_addresses(&description), vec![KEY.to_string()]);
    }
}
