//! The checkout state machine.
//!
//! A `CheckoutDraft` collects a payment method and method-specific details,
//! validates them, and walks `SelectingMethod -> FillingDetails -> Reviewing
//! -> Settling -> {Succeeded | Failed}`. Drafts are ephemeral: nothing here
//! is persisted until settlement succeeds and the caller writes the
//! resulting entitlement.
//!
//! A failed settlement is not a dead end: the draft keeps its validated
//! details so the user can confirm again without re-entering anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{AccountEmail, DraftId};
use crate::plan::PlanId;
use crate::validate::{self, FieldError};

/// A supported cryptocurrency for the crypto payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoCurrency {
    /// Bitcoin (legacy, P2SH, or bech32 addresses).
    Bitcoin,

    /// Ethereum (`0x` + 40 hex).
    Ethereum,

    /// Solana (base58, 32-44 chars).
    Solana,
}

impl CryptoCurrency {
    /// The lowercase currency name used in method tags and URI schemes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Solana => "solana",
        }
    }
}

impl FromStr for CryptoCurrency {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" => Ok(Self::Bitcoin),
            "ethereum" => Ok(Self::Ethereum),
            "solana" => Ok(Self::Solana),
            _ => Err(UnknownMethod(format!("crypto-{s}"))),
        }
    }
}

impl fmt::Display for CryptoCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment method tag.
///
/// Serialized as `mpesa`, `card`, `paypal`, or `crypto-<currency>`, the
/// same tag that ends up on the entitlement record for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMethod {
    /// M-Pesa mobile-money push.
    Mpesa,

    /// Credit or debit card.
    Card,

    /// PayPal-style wallet keyed by email.
    Paypal,

    /// On-chain payment in the given currency.
    Crypto(CryptoCurrency),
}

impl PaymentMethod {
    /// The wire tag for this method.
    #[must_use]
    pub fn tag(self) -> String {
        match self {
            Self::Mpesa => "mpesa".to_string(),
            Self::Card => "card".to_string(),
            Self::Paypal => "paypal".to_string(),
            Self::Crypto(currency) => format!("crypto-{currency}"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpesa" => Ok(Self::Mpesa),
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::Paypal),
            _ => {
                if let Some(currency) = s.strip_prefix("crypto-") {
                    return Ok(Self::Crypto(currency.parse()?));
                }
                Err(UnknownMethod(s.to_string()))
            }
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = UnknownMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.tag()
    }
}

/// Error returned for an unrecognized payment method tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownMethod(pub String);

/// The generic billing block collected for card and wallet methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    /// Full name of the payer.
    pub full_name: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// Country.
    pub country: String,
    /// Postal code.
    pub postal_code: String,
    /// Billing contact email.
    pub email: String,
}

/// Card fields. Simulated only: the number is never stored past the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Name on the card.
    pub holder_name: String,
    /// Card number, separators allowed.
    pub number: String,
    /// Expiry as `MM/YY`.
    pub expiry: String,
    /// Security code.
    pub cvv: String,
}

/// Validated method-specific payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentDetails {
    /// Mobile-money push to a phone number.
    MobileMoney {
        /// The subscriber phone number.
        phone: String,
    },

    /// Card payment with billing block.
    Card {
        /// Card fields.
        card: CardDetails,
        /// Generic billing block.
        billing: BillingDetails,
    },

    /// Wallet payment keyed by email, with billing block.
    Wallet {
        /// Wallet account email.
        email: String,
        /// Generic billing block.
        billing: BillingDetails,
    },

    /// On-chain payment to an address.
    Crypto {
        /// The currency determining the address shape.
        currency: CryptoCurrency,
        /// The destination address.
        address: String,
    },
}

impl PaymentDetails {
    /// The method these details belong to.
    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::MobileMoney { .. } => PaymentMethod::Mpesa,
            Self::Card { .. } => PaymentMethod::Card,
            Self::Wallet { .. } => PaymentMethod::Paypal,
            Self::Crypto { currency, .. } => PaymentMethod::Crypto(*currency),
        }
    }

    /// Run every field check for this method.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        match self {
            Self::MobileMoney { phone } => validate::check_phone(phone).into_iter().collect(),
            Self::Card { card, billing } => {
                let mut errors = validate::check_card(card);
                errors.extend(validate::check_billing(billing));
                errors
            }
            Self::Wallet { email, billing } => {
                let mut errors: Vec<_> = validate::check_wallet_email(email).into_iter().collect();
                errors.extend(validate::check_billing(billing));
                errors
            }
            Self::Crypto { currency, address } => {
                if validate::is_valid_crypto_address(*currency, address) {
                    Vec::new()
                } else {
                    vec![FieldError::new(
                        "address",
                        format!("enter a valid {currency} address"),
                    )]
                }
            }
        }
    }
}

/// The checkout machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// Picking a payment method.
    SelectingMethod,

    /// Entering method-specific details.
    FillingDetails,

    /// Details validated; waiting for explicit confirmation.
    Reviewing,

    /// Settlement in flight; the draft rejects all other operations.
    Settling,

    /// Settlement completed and the entitlement was written.
    Succeeded,

    /// Settlement failed; details are preserved for retry.
    Failed,
}

/// An ephemeral checkout draft.
///
/// Field errors and the last settlement error live on the draft so the UI
/// can surface them in place; they are cleared by the next successful
/// transition. Deliberately not serializable: raw card fields must not
/// leave the process.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    /// Draft id.
    pub id: DraftId,

    /// The purchasing account.
    pub account_email: AccountEmail,

    /// The plan being bought.
    pub plan_id: PlanId,

    /// Current machine state.
    pub state: CheckoutState,

    /// Selected payment method, once past `SelectingMethod`.
    pub method: Option<PaymentMethod>,

    /// Submitted details, only present after they validated.
    pub details: Option<PaymentDetails>,

    /// Field errors from the last rejected submission.
    pub errors: Vec<FieldError>,

    /// Top-level error from the last failed settlement.
    pub last_error: Option<String>,

    /// When the draft was opened.
    pub created_at: DateTime<Utc>,
}

impl CheckoutDraft {
    /// Open a draft for a plan, in `SelectingMethod`.
    #[must_use]
    pub fn new(account_email: AccountEmail, plan_id: PlanId, now: DateTime<Utc>) -> Self {
        Self {
            id: DraftId::generate(),
            account_email,
            plan_id,
            state: CheckoutState::SelectingMethod,
            method: None,
            details: None,
            errors: Vec::new(),
            last_error: None,
            created_at: now,
        }
    }

    /// Select (or change) the payment method.
    ///
    /// Changing method discards previously entered details and returns the
    /// draft to `FillingDetails`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` while settling or after
    /// success.
    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::SelectingMethod
            | CheckoutState::FillingDetails
            | CheckoutState::Reviewing
            | CheckoutState::Failed => {
                if self.method != Some(method) {
                    self.details = None;
                }
                self.method = Some(method);
                self.errors.clear();
                self.state = CheckoutState::FillingDetails;
                Ok(())
            }
            state => Err(CheckoutError::InvalidTransition {
                from: state,
                action: "select_method",
            }),
        }
    }

    /// Submit method-specific details.
    ///
    /// On success the draft moves to `Reviewing`. On validation failure the
    /// errors are recorded on the draft, the state does not change, and the
    /// previously accepted details (if any) are kept.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::InvalidTransition` outside `FillingDetails`,
    ///   `Reviewing`, or `Failed`.
    /// - `CheckoutError::MethodMismatch` if the details are for a different
    ///   method than the one selected.
    /// - `CheckoutError::Validation` carrying the field errors.
    pub fn submit_details(&mut self, details: PaymentDetails) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::FillingDetails | CheckoutState::Reviewing | CheckoutState::Failed => {}
            state => {
                return Err(CheckoutError::InvalidTransition {
                    from: state,
                    action: "submit_details",
                })
            }
        }

        let Some(method) = self.method else {
            return Err(CheckoutError::MethodNotSelected);
        };
        if details.method() != method {
            return Err(CheckoutError::MethodMismatch {
                selected: method,
                submitted: details.method(),
            });
        }

        let errors = details.validate();
        if !errors.is_empty() {
            self.errors.clone_from(&errors);
            return Err(CheckoutError::Validation(errors));
        }

        self.errors.clear();
        self.last_error = None;
        self.details = Some(details);
        self.state = CheckoutState::Reviewing;
        Ok(())
    }

    /// Begin settlement after explicit user confirmation.
    ///
    /// Allowed from `Reviewing`, or from `Failed` when validated details are
    /// still on the draft (retry without re-entering). Returns the details
    /// to hand to the gateway; the draft is left in `Settling`, where every
    /// other operation is rejected until `complete` or `fail`.
    ///
    /// # Errors
    ///
    /// `CheckoutError::SettlementInFlight` when already settling, otherwise
    /// `CheckoutError::InvalidTransition`.
    pub fn begin_settlement(&mut self) -> Result<PaymentDetails, CheckoutError> {
        match self.state {
            CheckoutState::Reviewing => {}
            CheckoutState::Failed if self.details.is_some() => {}
            CheckoutState::Settling => return Err(CheckoutError::SettlementInFlight),
            state => {
                return Err(CheckoutError::InvalidTransition {
                    from: state,
                    action: "confirm",
                })
            }
        }

        let details = self
            .details
            .clone()
            .ok_or(CheckoutError::MethodNotSelected)?;
        self.state = CheckoutState::Settling;
        Ok(details)
    }

    /// Record a successful settlement.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` unless settling.
    pub fn complete(&mut self) -> Result<(), CheckoutError> {
        if self.state != CheckoutState::Settling {
            return Err(CheckoutError::InvalidTransition {
                from: self.state,
                action: "complete",
            });
        }
        self.state = CheckoutState::Succeeded;
        Ok(())
    }

    /// Record a failed settlement.
    ///
    /// The draft keeps its details so the user can retry; the error is
    /// surfaced as a single top-level message.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidTransition` unless settling.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CheckoutError> {
        if self.state != CheckoutState::Settling {
            return Err(CheckoutError::InvalidTransition {
                from: self.state,
                action: "fail",
            });
        }
        self.last_error = Some(message.into());
        self.state = CheckoutState::Failed;
        Ok(())
    }
}

/// Errors produced by the checkout machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// The requested action is not legal in the current state.
    #[error("cannot {action} while checkout is {from:?}")]
    InvalidTransition {
        /// State the draft was in.
        from: CheckoutState,
        /// The rejected action.
        action: &'static str,
    },

    /// Details were submitted before a method was selected.
    #[error("no payment method selected")]
    MethodNotSelected,

    /// Details belong to a different method than the selected one.
    #[error("details are for {submitted}, but {selected} is selected")]
    MethodMismatch {
        /// The method on the draft.
        selected: PaymentMethod,
        /// The method the details belong to.
        submitted: PaymentMethod,
    },

    /// One or more fields failed validation.
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<FieldError>),

    /// A settlement is already in flight for this draft.
    #[error("settlement already in progress")]
    SettlementInFlight,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CheckoutDraft {
        CheckoutDraft::new(
            AccountEmail::new("a@x.com").unwrap(),
            PlanId::ClientPro,
            Utc::now(),
        )
    }

    fn mpesa_details() -> PaymentDetails {
        PaymentDetails::MobileMoney {
            phone: "0712345678".into(),
        }
    }

    #[test]
    fn method_tag_roundtrip() {
        for tag in ["mpesa", "card", "paypal", "crypto-bitcoin", "crypto-ethereum"] {
            let method: PaymentMethod = tag.parse().unwrap();
            assert_eq!(method.tag(), tag);
        }
        assert!("cash".parse::<PaymentMethod>().is_err());
        assert!("crypto-doge".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn happy_path_reaches_succeeded() {
        let mut draft = draft();
        assert_eq!(draft.state, CheckoutState::SelectingMethod);

        draft.select_method(PaymentMethod::Mpesa).unwrap();
        assert_eq!(draft.state, CheckoutState::FillingDetails);

        draft.submit_details(mpesa_details()).unwrap();
        assert_eq!(draft.state, CheckoutState::Reviewing);

        let details = draft.begin_settlement().unwrap();
        assert_eq!(details.method(), PaymentMethod::Mpesa);
        assert_eq!(draft.state, CheckoutState::Settling);

        draft.complete().unwrap();
        assert_eq!(draft.state, CheckoutState::Succeeded);
    }

    #[test]
    fn invalid_details_keep_state_and_record_errors() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Mpesa).unwrap();

        let err = draft
            .submit_details(PaymentDetails::MobileMoney {
                phone: "12345".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(draft.state, CheckoutState::FillingDetails);
        assert_eq!(draft.errors.len(), 1);
        assert_eq!(draft.errors[0].field, "phone");
    }

    #[test]
    fn confirmation_is_required_before_settling() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Mpesa).unwrap();

        // Cannot settle straight from FillingDetails.
        assert!(matches!(
            draft.begin_settlement(),
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn double_submit_is_rejected_while_settling() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Mpesa).unwrap();
        draft.submit_details(mpesa_details()).unwrap();
        draft.begin_settlement().unwrap();

        assert_eq!(
            draft.begin_settlement(),
            Err(CheckoutError::SettlementInFlight)
        );
        assert!(matches!(
            draft.submit_details(mpesa_details()),
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn failed_settlement_is_retryable_without_reentry() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Mpesa).unwrap();
        draft.submit_details(mpesa_details()).unwrap();
        draft.begin_settlement().unwrap();
        draft.fail("gateway unavailable").unwrap();

        assert_eq!(draft.state, CheckoutState::Failed);
        assert_eq!(draft.last_error.as_deref(), Some("gateway unavailable"));
        assert!(draft.details.is_some());

        // Retry straight from Failed: details survive.
        let details = draft.begin_settlement().unwrap();
        assert_eq!(details, mpesa_details());
        draft.complete().unwrap();
        assert_eq!(draft.state, CheckoutState::Succeeded);
    }

    #[test]
    fn changing_method_discards_details() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Mpesa).unwrap();
        draft.submit_details(mpesa_details()).unwrap();

        draft.select_method(PaymentMethod::Card).unwrap();
        assert_eq!(draft.state, CheckoutState::FillingDetails);
        assert!(draft.details.is_none());

        assert_eq!(
            draft.submit_details(mpesa_details()),
            Err(CheckoutError::MethodMismatch {
                selected: PaymentMethod::Card,
                submitted: PaymentMethod::Mpesa,
            })
        );
    }

    #[test]
    fn wallet_details_require_billing_block() {
        let mut draft = draft();
        draft.select_method(PaymentMethod::Paypal).unwrap();

        let err = draft
            .submit_details(PaymentDetails::Wallet {
                email: "payer@wallet.example".into(),
                billing: BillingDetails::default(),
            })
            .unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.iter().any(|e| e.field == "full_name"));
        assert!(errors.iter().any(|e| e.field == "postal_code"));
    }
}
