//! Account Types
//!
//! Regular trading accounts and prop-challenge accounts arrive in two
//! different wire shapes. Both are normalized into [`TradingAccount`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Challenge evaluation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    Active,
    Passed,
    Failed,
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeStatus::Active => write!(f, "ACTIVE"),
            ChallengeStatus::Passed => write!(f, "PASSED"),
            ChallengeStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Which account is live. At most one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveSelection {
    Regular(String),
    Challenge(String),
}

impl ActiveSelection {
    pub fn id(&self) -> &str {
        match self {
            ActiveSelection::Regular(id) | ActiveSelection::Challenge(id) => id,
        }
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self, ActiveSelection::Challenge(_))
    }
}

// =============================================================================
// Leverage
// =============================================================================

/// Parse a `"1:100"` leverage string into its multiplier.
///
/// Falls back to 100 when the string is malformed or non-positive.
pub fn parse_leverage(leverage: &str) -> f64 {
    const FALLBACK: f64 = 100.0;
    let ratio = match leverage.split_once(':') {
        Some((lhs, rhs)) => {
            let lhs: f64 = lhs.trim().parse().unwrap_or(0.0);
            let rhs: f64 = rhs.trim().parse().unwrap_or(0.0);
            if lhs > 0.0 { rhs / lhs } else { 0.0 }
        }
        None => leverage.trim().parse().unwrap_or(0.0),
    };
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        FALLBACK
    }
}

fn default_leverage() -> String {
    "1:100".to_string()
}

// =============================================================================
// Challenge
// =============================================================================

/// Risk rules attached to a challenge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRules {
    #[serde(default)]
    pub max_daily_drawdown_percent: Option<f64>,
    #[serde(default)]
    pub max_overall_drawdown_percent: Option<f64>,
    #[serde(default)]
    pub profit_target_phase1_percent: Option<f64>,
    #[serde(default)]
    pub stop_loss_mandatory: bool,
}

/// The challenge definition an account is enrolled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: ChallengeRules,
}

/// Challenge-only account state, including the drawdown baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDetails {
    pub current_step: u32,
    pub challenge: Challenge,
    pub status: ChallengeStatus,
    pub initial_balance: f64,
    pub day_start_equity: f64,
    pub lowest_equity_overall: f64,
    pub current_balance: f64,
    pub current_equity: f64,
    pub fail_reason: Option<String>,
}

// =============================================================================
// Normalized account
// =============================================================================

/// Regular or challenge flavor of a [`TradingAccount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountKind {
    Regular,
    Challenge(ChallengeDetails),
}

/// One account, regardless of which endpoint it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingAccount {
    /// Backend document id, used in routes and order bodies.
    pub id: String,
    /// Human-facing account number.
    pub account_id: String,
    pub balance: f64,
    pub credit: f64,
    pub leverage: String,
    pub kind: AccountKind,
}

impl TradingAccount {
    pub fn is_challenge(&self) -> bool {
        matches!(self.kind, AccountKind::Challenge(_))
    }

    pub fn challenge(&self) -> Option<&ChallengeDetails> {
        match &self.kind {
            AccountKind::Challenge(details) => Some(details),
            AccountKind::Regular => None,
        }
    }

    pub fn rules(&self) -> Option<&ChallengeRules> {
        self.challenge().map(|c| &c.challenge.rules)
    }

    pub fn leverage_ratio(&self) -> f64 {
        parse_leverage(&self.leverage)
    }

    pub fn selection(&self) -> ActiveSelection {
        if self.is_challenge() {
            ActiveSelection::Challenge(self.id.clone())
        } else {
            ActiveSelection::Regular(self.id.clone())
        }
    }
}

// =============================================================================
// Wire shapes
// =============================================================================

/// `GET /trading-accounts/user/{id}` element.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularAccountDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default = "default_leverage")]
    pub leverage: String,
}

impl From<RegularAccountDto> for TradingAccount {
    fn from(dto: RegularAccountDto) -> Self {
        Self {
            id: dto.id,
            account_id: dto.account_id,
            balance: dto.balance,
            credit: dto.credit,
            leverage: dto.leverage,
            kind: AccountKind::Regular,
        }
    }
}

/// `GET /prop/my-accounts/{id}` element.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAccountDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub current_step: u32,
    #[serde(default)]
    pub challenge_id: Challenge,
    pub status: ChallengeStatus,
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default)]
    pub current_equity: f64,
    #[serde(default)]
    pub day_start_equity: Option<f64>,
    #[serde(default)]
    pub lowest_equity_overall: Option<f64>,
    #[serde(default)]
    pub credit: f64,
    #[serde(default = "default_leverage")]
    pub leverage: String,
    #[serde(default)]
    pub fail_reason: Option<String>,
}

impl From<ChallengeAccountDto> for TradingAccount {
    fn from(dto: ChallengeAccountDto) -> Self {
        // Missing baselines fall back to the initial balance.
        let day_start_equity = dto.day_start_equity.unwrap_or(dto.initial_balance);
        let lowest_equity_overall = dto.lowest_equity_overall.unwrap_or(dto.initial_balance);

        Self {
            id: dto.id,
            account_id: dto.account_id,
            balance: dto.current_balance,
            credit: dto.credit,
            leverage: dto.leverage,
            kind: AccountKind::Challenge(ChallengeDetails {
                current_step: dto.current_step,
                challenge: dto.challenge_id,
                status: dto.status,
                initial_balance: dto.initial_balance,
                day_start_equity,
                lowest_equity_overall,
                current_balance: dto.current_balance,
                current_equity: dto.current_equity,
                fail_reason: dto.fail_reason,
            }),
        }
    }
}

/// Envelope of `GET /trading-accounts/user/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegularAccountsResponse {
    #[serde(default)]
    pub accounts: Vec<RegularAccountDto>,
}

/// Envelope of `GET /prop/my-accounts/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeAccountsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub accounts: Vec<ChallengeAccountDto>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Summary
// =============================================================================

/// Account summary as returned by `/trade/summary/{id}` or synthesized
/// locally for challenge accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(default)]
    pub balance: f64,
    /// `None` when the endpoint omits it; the account's credit applies.
    #[serde(default)]
    pub credit: Option<f64>,
    #[serde(default)]
    pub equity: f64,
    #[serde(default, alias = "margin")]
    pub used_margin: f64,
    #[serde(default)]
    pub free_margin: f64,
    #[serde(default, alias = "totalPnl")]
    pub floating_pnl: f64,
    #[serde(default)]
    pub margin_level: Option<f64>,
}

/// Envelope of `GET /trade/summary/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub summary: Option<AccountSummary>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leverage() {
        assert_eq!(parse_leverage("1:100"), 100.0);
        assert_eq!(parse_leverage("1:500"), 500.0);
        assert_eq!(parse_leverage("2:100"), 50.0);
        assert_eq!(parse_leverage("200"), 200.0);
    }

    #[test]
    fn test_parse_leverage_fallback() {
        assert_eq!(parse_leverage(""), 100.0);
        assert_eq!(parse_leverage("abc"), 100.0);
        assert_eq!(parse_leverage("0:100"), 100.0);
        assert_eq!(parse_leverage("1:-5"), 100.0);
    }

    #[test]
    fn test_regular_dto_conversion() {
        let json = r#"{"_id": "a1", "accountId": "100234", "balance": 5000.0, "credit": 250.0, "leverage": "1:200"}"#;
        let dto: RegularAccountDto = serde_json::from_str(json).unwrap();
        let account = TradingAccount::from(dto);

        assert_eq!(account.id, "a1");
        assert_eq!(account.account_id, "100234");
        assert!(!account.is_challenge());
        assert_eq!(account.leverage_ratio(), 200.0);
        assert_eq!(account.selection(), ActiveSelection::Regular("a1".to_string()));
    }

    #[test]
    fn test_challenge_dto_conversion() {
        let json = r#"{
            "_id": "c1",
            "accountId": "CH-77",
            "currentStep": 1,
            "challengeId": {
                "name": "Two Step 10K",
                "rules": {
                    "maxDailyDrawdownPercent": 5,
                    "maxOverallDrawdownPercent": 10,
                    "profitTargetPhase1Percent": 8,
                    "stopLossMandatory": true
                }
            },
            "status": "ACTIVE",
            "initialBalance": 10000,
            "currentBalance": 10120,
            "currentEquity": 10080,
            "dayStartEquity": 10050,
            "lowestEquityOverall": 9900
        }"#;
        let dto: ChallengeAccountDto = serde_json::from_str(json).unwrap();
        let account = TradingAccount::from(dto);

        assert!(account.is_challenge());
        assert_eq!(account.balance, 10120.0);
        let details = account.challenge().unwrap();
        assert_eq!(details.status, ChallengeStatus::Active);
        assert_eq!(details.day_start_equity, 10050.0);
        assert_eq!(details.lowest_equity_overall, 9900.0);
        assert!(account.rules().unwrap().stop_loss_mandatory);
        assert_eq!(account.leverage, "1:100");
    }

    #[test]
    fn test_challenge_dto_missing_baselines() {
        let json = r#"{"_id": "c2", "status": "FAILED", "initialBalance": 25000, "failReason": "Daily drawdown"}"#;
        let account = TradingAccount::from(serde_json::from_str::<ChallengeAccountDto>(json).unwrap());
        let details = account.challenge().unwrap();

        assert_eq!(details.day_start_equity, 25000.0);
        assert_eq!(details.lowest_equity_overall, 25000.0);
        assert_eq!(details.fail_reason.as_deref(), Some("Daily drawdown"));
    }

    #[test]
    fn test_summary_margin_alias() {
        let json = r#"{"balance": 1000, "equity": 1010, "margin": 50, "freeMargin": 950}"#;
        let summary: AccountSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.used_margin, 50.0);
        assert_eq!(summary.free_margin, 950.0);
    }
}
