//! Authentication extractors.
//!
//! Identity is owned by an external collaborator; this subsystem only
//! consumes the current account's email and display name, read-only. The
//! bearer scheme here (`test-token:<email>[:<display name>]`) is the
//! collaborator stand-in used throughout the simulation.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use kazi_core::AccountEmail;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated account on a request.
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    /// The account email (the entitlement foreign key).
    pub email: AccountEmail,

    /// Display name, for message copy.
    pub display_name: String,
}

fn account_from_parts(parts: &Parts) -> Option<CurrentAccount> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    let rest = token.strip_prefix("test-token:")?;

    let (email_part, name_part) = match rest.split_once(':') {
        Some((email, name)) => (email, Some(name)),
        None => (rest, None),
    };

    let email: AccountEmail = email_part.parse().ok()?;
    let display_name = name_part
        .map_or_else(|| email_part.to_string(), ToString::to_string);

    Some(CurrentAccount {
        email,
        display_name,
    })
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        account_from_parts(parts).ok_or(ApiError::NotAuthenticated)
    }
}

/// An account that may or may not be present.
///
/// The access evaluator treats "no account" as a decision
/// (`no_account`), not a transport error, so routes that feed it use this
/// extractor instead of rejecting outright.
#[derive(Debug, Clone)]
pub struct OptionalAccount(pub Option<CurrentAccount>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAccount {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(account_from_parts(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: &str) -> Parts {
        let request = Request::builder()
            .uri("/")
            .header("authorization", value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn parses_email_and_display_name() {
        let parts = parts_with_auth("Bearer test-token:a@x.com:Jane Fixit");
        let account = account_from_parts(&parts).unwrap();
        assert_eq!(account.email.as_str(), "a@x.com");
        assert_eq!(account.display_name, "Jane Fixit");
    }

    #[test]
    fn display_name_defaults_to_email() {
        let parts = parts_with_auth("Bearer test-token:a@x.com");
        let account = account_from_parts(&parts).unwrap();
        assert_eq!(account.display_name, "a@x.com");
    }

    #[test]
    fn rejects_foreign_schemes_and_bad_emails() {
        assert!(account_from_parts(&parts_with_auth("Bearer other:a@x.com")).is_none());
        assert!(account_from_parts(&parts_with_auth("Bearer test-token:nope")).is_none());
    }
}
