//! Core types shared across the valuation engine.
//!
//! These are the plain inputs the collaborator layer hands to the engine. They
//! are immutable for the duration of one calculation and supplied fresh each time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use valgap_common::config::CategoryWeights;

use crate::scoring::CoreFactors;

// ============================================================================
// Revenue Model
// ============================================================================

/// How the business earns its revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevenueModel {
    /// One-off engagements that must be re-won
    ProjectBased,
    /// Repeat but uncontracted purchases
    Transactional,
    /// Multi-period service or maintenance contracts
    RecurringContracts,
    /// Subscription / SaaS
    Subscription,
}

impl RevenueModel {
    /// Parse a collaborator-supplied code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PROJECT_BASED" | "PROJECT" => Some(Self::ProjectBased),
            "TRANSACTIONAL" => Some(Self::Transactional),
            "RECURRING_CONTRACTS" | "RECURRING" => Some(Self::RecurringContracts),
            "SUBSCRIPTION" | "SUBSCRIPTION_SAAS" | "SAAS" => Some(Self::Subscription),
            _ => None,
        }
    }
}

impl std::fmt::Display for RevenueModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectBased => write!(f, "project-based"),
            Self::Transactional => write!(f, "transactional"),
            Self::RecurringContracts => write!(f, "recurring contracts"),
            Self::Subscription => write!(f, "subscription"),
        }
    }
}

// ============================================================================
// Size Category
// ============================================================================

/// Revenue size band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeCategory {
    /// Revenue under $500K
    UnderHalfMillion,
    /// $500K - $1M
    HalfToOneMillion,
    /// $1M - $3M
    OneToThreeMillion,
    /// $3M - $10M
    ThreeToTenMillion,
    /// $10M - $25M
    TenToTwentyFiveMillion,
    /// Over $25M
    OverTwentyFiveMillion,
}

impl SizeCategory {
    /// Infer the band from raw revenue. Zero or negative revenue has no band.
    pub fn from_revenue(revenue: f64) -> Option<Self> {
        if !revenue.is_finite() || revenue <= 0.0 {
            return None;
        }
        let category = if revenue < 500_000.0 {
            Self::UnderHalfMillion
        } else if revenue < 1_000_000.0 {
            Self::HalfToOneMillion
        } else if revenue < 3_000_000.0 {
            Self::OneToThreeMillion
        } else if revenue < 10_000_000.0 {
            Self::ThreeToTenMillion
        } else if revenue < 25_000_000.0 {
            Self::TenToTwentyFiveMillion
        } else {
            Self::OverTwentyFiveMillion
        };
        Some(category)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderHalfMillion => "under $500K",
            Self::HalfToOneMillion => "$500K-$1M",
            Self::OneToThreeMillion => "$1M-$3M",
            Self::ThreeToTenMillion => "$3M-$10M",
            Self::TenToTwentyFiveMillion => "$10M-$25M",
            Self::OverTwentyFiveMillion => "over $25M",
        }
    }
}

// ============================================================================
// Financial Profile
// ============================================================================

/// Financial facts for one calculation call.
///
/// Rates are decimals (0.25 = 25%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub revenue: f64,
    pub ebitda: f64,
    #[serde(default)]
    pub owner_compensation: Option<f64>,
    /// Explicit size band; inferred from revenue when absent
    #[serde(default)]
    pub size_category: Option<SizeCategory>,
    /// Year-over-year revenue growth
    #[serde(default)]
    pub revenue_growth_rate: Option<f64>,
    /// EBITDA margin; derived from EBITDA / revenue when absent
    #[serde(default)]
    pub ebitda_margin: Option<f64>,
    /// Share of revenue from the single largest customer
    #[serde(default)]
    pub top_customer_concentration: Option<f64>,
    /// Share of revenue from the three largest customers
    #[serde(default)]
    pub top3_customer_concentration: Option<f64>,
    #[serde(default)]
    pub revenue_model: Option<RevenueModel>,
    /// Coarse recurring flag used when no revenue model is known
    #[serde(default)]
    pub is_recurring: Option<bool>,
}

impl FinancialProfile {
    /// Size band: explicit category first, then inferred from revenue.
    pub fn size_tier(&self) -> Option<SizeCategory> {
        self.size_category
            .or_else(|| SizeCategory::from_revenue(self.revenue))
    }

    /// EBITDA margin: explicit value first, then EBITDA / revenue.
    pub fn effective_ebitda_margin(&self) -> Option<f64> {
        self.ebitda_margin.or_else(|| {
            if self.revenue > 0.0 {
                Some(self.ebitda / self.revenue)
            } else {
                None
            }
        })
    }
}

// ============================================================================
// Readiness Categories
// ============================================================================

/// Buyer-readiness assessment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessCategory {
    Financial,
    Transferability,
    Operational,
    Market,
    LegalTax,
    Personal,
}

impl ReadinessCategory {
    /// All categories in reporting order.
    pub const ALL: [ReadinessCategory; 6] = [
        Self::Financial,
        Self::Transferability,
        Self::Operational,
        Self::Market,
        Self::LegalTax,
        Self::Personal,
    ];

    /// Stable key used in persisted records.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Transferability => "transferability",
            Self::Operational => "operational",
            Self::Market => "market",
            Self::LegalTax => "legal_tax",
            Self::Personal => "personal",
        }
    }

    /// Configured raw (un-normalized) weight for this category.
    pub fn raw_weight(&self, weights: &CategoryWeights) -> f64 {
        match self {
            Self::Financial => weights.financial,
            Self::Transferability => weights.transferability,
            Self::Operational => weights.operational,
            Self::Market => weights.market,
            Self::LegalTax => weights.legal_tax,
            Self::Personal => weights.personal,
        }
    }
}

impl std::fmt::Display for ReadinessCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Financial => write!(f, "Financial"),
            Self::Transferability => write!(f, "Transferability"),
            Self::Operational => write!(f, "Operational"),
            Self::Market => write!(f, "Market"),
            Self::LegalTax => write!(f, "Legal/Tax"),
            Self::Personal => write!(f, "Personal"),
        }
    }
}

/// Readiness score for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: ReadinessCategory,
    pub earned_points: f64,
    pub total_points: f64,
    /// earned / total, in [0, 1]
    pub score: f64,
    /// Normalized weight (weights of the scored categories sum to 1)
    pub weight: f64,
}

/// Look up one category's score in a scored set.
pub fn category_score(scores: &[CategoryScore], category: ReadinessCategory) -> Option<f64> {
    scores
        .iter()
        .find(|s| s.category == category)
        .map(|s| s.score)
}

/// One answered (or skipped) assessment question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub question_id: String,
    pub category: ReadinessCategory,
    pub max_points: f64,
    /// Resolved answer value in [0, 1]; `None` when the answer is unusable
    #[serde(default)]
    pub score_value: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Industry Classification
// ============================================================================

/// Four-level industry classification, most specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub sub_sector: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub super_sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

// ============================================================================
// Financial Periods
// ============================================================================

/// One annual financial period with income, cash-flow and balance-sheet detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub fiscal_year: i32,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub ebitda: f64,
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    /// Capital expenditures (sign-insensitive)
    #[serde(default)]
    pub capital_expenditures: Option<f64>,
    /// Reported free cash flow, preferred over OCF - capex when present
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub interest_expense: Option<f64>,
    #[serde(default)]
    pub income_tax_expense: Option<f64>,
    #[serde(default)]
    pub pre_tax_income: Option<f64>,
    #[serde(default)]
    pub total_debt: Option<f64>,
    #[serde(default)]
    pub cash: Option<f64>,
}

impl FinancialPeriod {
    /// Free cash flow: reported figure, else operating cash flow minus capex.
    pub fn free_cash_flow(&self) -> Option<f64> {
        self.free_cash_flow.or_else(|| {
            self.operating_cash_flow
                .map(|ocf| ocf - self.capital_expenditures.unwrap_or(0.0).abs())
        })
    }

    /// Interest expense / total debt, when both are present and debt is positive.
    pub fn implied_cost_of_debt(&self) -> Option<f64> {
        match (self.interest_expense, self.total_debt) {
            (Some(interest), Some(debt)) if debt > 0.0 => Some(interest.abs() / debt),
            _ => None,
        }
    }

    /// Tax expense / pre-tax income, when pre-tax income is positive.
    pub fn effective_tax_rate(&self) -> Option<f64> {
        match (self.income_tax_expense, self.pre_tax_income) {
            (Some(tax), Some(ebt)) if ebt > 0.0 => Some(tax / ebt),
            _ => None,
        }
    }

    /// Total debt minus cash.
    pub fn net_debt(&self) -> f64 {
        self.total_debt.unwrap_or(0.0) - self.cash.unwrap_or(0.0)
    }
}

// ============================================================================
// Company Record
// ============================================================================

/// Company record supplied by the collaborator layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub name: String,
    pub profile: FinancialProfile,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub core_factors: CoreFactors,
    /// DCF assumptions were configured by hand; skip the automatic cross-check
    #[serde(default)]
    pub dcf_manually_configured: bool,
}

impl CompanyRecord {
    /// Profile with the revenue model filled in from the core factors when the
    /// financial record lacks one.
    pub fn effective_profile(&self) -> FinancialProfile {
        let mut profile = self.profile.clone();
        if profile.revenue_model.is_none() {
            profile.revenue_model = self.core_factors.revenue_model();
        }
        profile
    }
}

/// Round to whole currency units.
pub(crate) fn round_currency(value: f64) -> f64 {
    value.round()
}
