//! Field validation primitives for the checkout flow.
//!
//! All checks are simulation-grade: they gate the `FillingDetails` to
//! `Reviewing` transition, they do not talk to any card network or ledger.

use serde::Serialize;

use crate::checkout::{BillingDetails, CardDetails, CryptoCurrency};

/// Minimum digits in a mobile-money phone number after stripping.
pub const MIN_PHONE_DIGITS: usize = 9;

/// Minimum digits in a card number after stripping separators.
pub const MIN_CARD_DIGITS: usize = 13;

/// A field-scoped validation error.
///
/// Field names match the wire names of the checkout details payload so the
/// UI can attach the message to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The offending field.
    pub field: &'static str,

    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Strip every non-digit character.
#[must_use]
pub fn strip_non_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// A light-weight well-formedness check for email addresses.
///
/// One `@`, a non-empty local part, and a dotted domain. Deliverability is
/// the identity collaborator's problem.
#[must_use]
pub fn is_well_formed_email(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || input.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && !domain.contains('@')
}

/// Validate a mobile-money phone number.
#[must_use]
pub fn check_phone(phone: &str) -> Option<FieldError> {
    if strip_non_digits(phone).len() < MIN_PHONE_DIGITS {
        return Some(FieldError::new(
            "phone",
            format!("enter a phone number with at least {MIN_PHONE_DIGITS} digits"),
        ));
    }
    None
}

/// Validate a wallet account email.
#[must_use]
pub fn check_wallet_email(email: &str) -> Option<FieldError> {
    if is_well_formed_email(email.trim()) {
        None
    } else {
        Some(FieldError::new("email", "enter a valid email address"))
    }
}

/// `MM/YY` with a real month.
#[must_use]
pub fn is_valid_expiry(expiry: &str) -> bool {
    let bytes = expiry.as_bytes();
    if bytes.len() != 5 || bytes[2] != b'/' {
        return false;
    }
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
    if !digits(&bytes[..2]) || !digits(&bytes[3..]) {
        return false;
    }
    let month: u8 = expiry[..2].parse().unwrap_or(0);
    (1..=12).contains(&month)
}

/// Validate card fields. Returns one error per failing field.
#[must_use]
pub fn check_card(card: &CardDetails) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if card.holder_name.trim().len() < 2 {
        errors.push(FieldError::new("name", "enter the name on the card"));
    }
    if strip_non_digits(&card.number).len() < MIN_CARD_DIGITS {
        errors.push(FieldError::new("number", "enter a valid card number"));
    }
    if !is_valid_expiry(card.expiry.trim()) {
        errors.push(FieldError::new("expiry", "use MM/YY"));
    }
    if strip_non_digits(&card.cvv).len() < 3 {
        errors.push(FieldError::new("cvv", "enter the security code"));
    }

    errors
}

/// Validate the generic billing block shared by card and wallet methods.
#[must_use]
pub fn check_billing(billing: &BillingDetails) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let mut require = |field, value: &str, min: usize, message: &str| {
        if value.trim().len() < min {
            errors.push(FieldError::new(field, message));
        }
    };

    require("full_name", &billing.full_name, 2, "enter your full name");
    require("address", &billing.address, 5, "enter your street address");
    require("city", &billing.city, 2, "enter your city");
    require("country", &billing.country, 2, "enter your country");
    require(
        "postal_code",
        &billing.postal_code,
        2,
        "enter your postal code",
    );

    if !is_well_formed_email(billing.email.trim()) {
        errors.push(FieldError::new("email", "enter a valid email address"));
    }

    errors
}

/// Validate a crypto address against the shape expected for the currency.
#[must_use]
pub fn is_valid_crypto_address(currency: CryptoCurrency, address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() {
        return false;
    }
    match currency {
        CryptoCurrency::Ethereum => is_ethereum_address(address),
        CryptoCurrency::Bitcoin => is_bitcoin_address(address),
        // Base58-like, length 32-44 (Solana and similar).
        CryptoCurrency::Solana => {
            (32..=44).contains(&address.len()) && address.chars().all(is_base58_char)
        }
    }
}

/// `0x` followed by exactly 40 hex characters.
#[must_use]
pub fn is_ethereum_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Legacy (`1...`), P2SH (`3...`), or bech32 (`bc1...`) shapes.
#[must_use]
pub fn is_bitcoin_address(address: &str) -> bool {
    if let Some(rest) = address.strip_prefix("bc1") {
        return (11..=71).contains(&rest.len())
            && rest
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    }
    if address.starts_with('1') || address.starts_with('3') {
        return (26..=35).contains(&address.len()) && address.chars().all(is_base58_char);
    }
    false
}

/// The base58 alphabet: alphanumeric without `0`, `O`, `I`, `l`.
#[must_use]
pub fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, number: &str, expiry: &str, cvv: &str) -> CardDetails {
        CardDetails {
            holder_name: name.into(),
            number: number.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
        }
    }

    #[test]
    fn phone_requires_nine_digits() {
        assert!(check_phone("0712345678").is_none());
        assert!(check_phone("+254 712 345 678").is_none());
        assert!(check_phone("12345678").is_some());
        assert!(check_phone("phone").is_some());
    }

    #[test]
    fn card_number_length() {
        // 12 digits rejected, 16 accepted with spaces stripped.
        let short = card("Jane Fixit", "4242 4242 4242", "07/26", "123");
        assert!(check_card(&short).iter().any(|e| e.field == "number"));

        let ok = card("Jane Fixit", "4242 4242 4242 4242", "07/26", "123");
        assert!(check_card(&ok).is_empty());
    }

    #[test]
    fn expiry_month_bounds() {
        assert!(is_valid_expiry("07/26"));
        assert!(is_valid_expiry("12/30"));
        assert!(!is_valid_expiry("13/25"));
        assert!(!is_valid_expiry("00/25"));
        assert!(!is_valid_expiry("7/26"));
        assert!(!is_valid_expiry("07-26"));
    }

    #[test]
    fn short_cvv_and_name_rejected() {
        let bad = card("J", "4242424242424242", "07/26", "12");
        let errors = check_card(&bad);
        assert!(errors.iter().any(|e| e.field == "name"));
        assert!(errors.iter().any(|e| e.field == "cvv"));
    }

    #[test]
    fn email_well_formedness() {
        assert!(is_well_formed_email("a@x.com"));
        assert!(is_well_formed_email("jane.fixit@mail.example.org"));
        assert!(!is_well_formed_email("a@x"));
        assert!(!is_well_formed_email("@x.com"));
        assert!(!is_well_formed_email("a x@y.com"));
        assert!(!is_well_formed_email("plain"));
    }

    #[test]
    fn ethereum_address_is_exactly_40_hex() {
        let ok = format!("0x{}", "ab".repeat(20));
        assert!(is_ethereum_address(&ok));
        assert!(!is_ethereum_address(&format!("0x{}", "ab".repeat(19))));
        assert!(!is_ethereum_address(&format!("0x{}a", "ab".repeat(20))));
        assert!(!is_ethereum_address(&"ab".repeat(21)));
        assert!(!is_ethereum_address(&format!("0x{}", "zz".repeat(20))));
    }

    #[test]
    fn bitcoin_address_shapes() {
        assert!(is_bitcoin_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(is_bitcoin_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"));
        assert!(is_bitcoin_address(
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"
        ));
        assert!(!is_bitcoin_address("2NByteAddressIsNotAThing"));
        assert!(!is_bitcoin_address("1short"));
    }

    #[test]
    fn solana_address_is_base58_in_range() {
        let ok: String = "A".repeat(40);
        assert!(is_valid_crypto_address(CryptoCurrency::Solana, &ok));
        assert!(!is_valid_crypto_address(
            CryptoCurrency::Solana,
            &"A".repeat(20)
        ));
        // 0, O, I, l are not base58.
        assert!(!is_valid_crypto_address(
            CryptoCurrency::Solana,
            &"O".repeat(40)
        ));
        assert!(!is_valid_crypto_address(CryptoCurrency::Solana, ""));
    }
}
