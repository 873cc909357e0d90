//! QR / pasted-payload address intake for the crypto method.
//!
//! Wallet apps hand out everything from bare addresses to BIP-21-style URIs
//! to full web links. `extract_address` digs a plausible address candidate
//! out of whatever was scanned or pasted; the caller must still run the
//! candidate through the currency shape check before accepting it into the
//! draft.

/// URI schemes that are known to carry an address as their body.
const KNOWN_SCHEMES: [&str; 3] = ["bitcoin:", "ethereum:", "solana:"];

/// Extract an address candidate from a scanned or pasted payload.
///
/// In order:
/// 1. strip a recognized `bitcoin:`/`ethereum:`/`solana:` scheme and take
///    the body up to any query string;
/// 2. parse URLs and read an `address`/`recipient` query parameter, falling
///    back to the trailing path segment;
/// 3. search for an Ethereum-shaped (`0x` + 40 hex) substring;
/// 4. strip any other `scheme:` prefix and take the remainder verbatim.
///
/// Returns `None` only when the payload boils down to nothing.
#[must_use]
pub fn extract_address(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    for scheme in KNOWN_SCHEMES {
        if let Some(body) = strip_prefix_ignore_case(payload, scheme) {
            return non_empty(before_query(body.trim_start_matches("//")));
        }
    }

    if payload.contains("://") {
        return extract_from_url(payload);
    }

    if let Some(eth) = find_ethereum_substring(payload) {
        return Some(eth);
    }

    if let Some((scheme, rest)) = payload.split_once(':') {
        // Only treat it as a scheme when it looks like one; "12:34" is not.
        if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return non_empty(rest.trim());
        }
    }

    Some(payload.to_string())
}

fn extract_from_url(payload: &str) -> Option<String> {
    let (path_part, query) = match payload.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (payload, None),
    };

    if let Some(query) = query {
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if matches!(key, "address" | "recipient") {
                if let Some(found) = non_empty(value) {
                    return Some(found);
                }
            }
        }
    }

    // Fall back to the trailing path segment.
    path_part
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(non_empty)
}

/// Find a `0x` + exactly-40-hex-chars run anywhere in the payload.
fn find_ethereum_substring(payload: &str) -> Option<String> {
    let bytes = payload.as_bytes();
    for start in 0..bytes.len().saturating_sub(41) {
        if bytes[start] != b'0' || bytes[start + 1] != b'x' {
            continue;
        }
        let hex_run = bytes[start + 2..]
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if hex_run >= 40 {
            return Some(payload[start..start + 42].to_string());
        }
    }
    None
}

fn strip_prefix_ignore_case<'a>(payload: &'a str, prefix: &str) -> Option<&'a str> {
    let head = payload.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &payload[prefix.len()..])
}

fn before_query(body: &str) -> &str {
    body.split(['?', '&']).next().unwrap_or(body)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
