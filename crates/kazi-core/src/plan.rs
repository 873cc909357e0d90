//! The static plan catalog.
//!
//! Plans are defined at build time and never persisted per-account; an
//! `Entitlement` references a plan by `PlanId` only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a catalog plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanId {
    /// Entry plan for handymen: appear in searches, limited leads.
    HandymanBasic,

    /// Full plan for handymen: unlimited leads, priority placement.
    HandymanPro,

    /// Plan for clients hiring out work: compatibility search, direct messaging.
    ClientPro,

    /// Plan for businesses posting jobs at volume.
    BusinessPlus,
}

impl PlanId {
    /// All plan ids in catalog order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::HandymanBasic,
            Self::HandymanPro,
            Self::ClientPro,
            Self::BusinessPlus,
        ]
    }

    /// The kebab-case identifier string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HandymanBasic => "handyman-basic",
            Self::HandymanPro => "handyman-pro",
            Self::ClientPro => "client-pro",
            Self::BusinessPlus => "business-plus",
        }
    }

    /// The catalog entry for this plan.
    #[must_use]
    pub const fn plan(self) -> &'static Plan {
        // CATALOG is declared in `all()` order.
        &CATALOG[self as usize]
    }
}

impl FromStr for PlanId {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "handyman-basic" => Ok(Self::HandymanBasic),
            "handyman-pro" => Ok(Self::HandymanPro),
            "client-pro" => Ok(Self::ClientPro),
            "business-plus" => Ok(Self::BusinessPlus),
            _ => Err(UnknownPlan(s.to_string())),
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a plan id string does not match the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan: {0}")]
pub struct UnknownPlan(pub String);

/// Who a plan is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Handymen offering services.
    Handyman,

    /// Clients hiring out work.
    Client,

    /// Businesses posting jobs at volume.
    Business,
}

/// A static catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// The plan identifier.
    pub id: PlanId,

    /// Human-readable title.
    pub title: &'static str,

    /// Monthly price in cents.
    pub monthly_price_cents: i64,

    /// Annual price in cents.
    pub annual_price_cents: i64,

    /// Target audience tag.
    pub audience: Audience,

    /// Ordered benefit strings shown on the plan card.
    pub benefits: &'static [&'static str],
}

impl Plan {
    /// Price for the given billing cycle, in cents.
    #[must_use]
    pub const fn price_cents(&self, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => self.monthly_price_cents,
            BillingCycle::Annual => self.annual_price_cents,
        }
    }
}

/// The full static catalog, in display order.
pub static CATALOG: [Plan; 4] = [
    Plan {
        id: PlanId::HandymanBasic,
        title: "Handyman Basic",
        monthly_price_cents: 999,
        annual_price_cents: 9990,
        audience: Audience::Handyman,
        benefits: &[
            "Appear in compatibility searches",
            "Up to 10 job leads per month",
            "Standard profile badge",
        ],
    },
    Plan {
        id: PlanId::HandymanPro,
        title: "Handyman Pro",
        monthly_price_cents: 1999,
        annual_price_cents: 19990,
        audience: Audience::Handyman,
        benefits: &[
            "Unlimited job leads",
            "Priority placement in search results",
            "Verified pro badge",
            "Direct client messaging",
        ],
    },
    Plan {
        id: PlanId::ClientPro,
        title: "Client Pro",
        monthly_price_cents: 1499,
        annual_price_cents: 14990,
        audience: Audience::Client,
        benefits: &[
            "Handyman compatibility search",
            "Unlimited direct messaging",
            "Saved searches and alerts",
        ],
    },
    Plan {
        id: PlanId::BusinessPlus,
        title: "Business Plus",
        monthly_price_cents: 4999,
        annual_price_cents: 49990,
        audience: Audience::Business,
        benefits: &[
            "Unlimited job postings",
            "Team accounts",
            "Applicant shortlisting tools",
            "Priority support",
        ],
    },
];

/// Return the full catalog.
#[must_use]
pub fn catalog() -> &'static [Plan] {
    &CATALOG
}

/// The monthly/annual pricing-view toggle.
///
/// A display preference persisted per account; not entitlement-relevant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    /// Show monthly pricing.
    #[default]
    Monthly,

    /// Show annual pricing.
    Annual,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_roundtrip() {
        for id in PlanId::all() {
            assert_eq!(id.as_str().parse::<PlanId>().unwrap(), id);
        }
        assert!("gold-plated".parse::<PlanId>().is_err());
    }

    #[test]
    fn plan_id_serde_uses_kebab_case() {
        let json = serde_json::to_string(&PlanId::HandymanBasic).unwrap();
        assert_eq!(json, "\"handyman-basic\"");
    }

    #[test]
    fn catalog_entries_match_their_ids() {
        for id in PlanId::all() {
            assert_eq!(id.plan().id, id);
        }
    }

    #[test]
    fn annual_pricing_is_discounted() {
        for plan in catalog() {
            assert!(plan.price_cents(BillingCycle::Annual) < plan.monthly_price_cents * 12);
        }
    }
}
