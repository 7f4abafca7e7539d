use serde::Serialize;

/// Round to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Challenge-only live figures, all percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMetrics {
    pub daily_drawdown_pct: f64,
    pub overall_drawdown_pct: f64,
    pub profit_pct: f64,
    /// Daily drawdown reached the rule limit (unrounded comparison).
    pub daily_breached: bool,
    /// Overall drawdown reached the rule limit (unrounded comparison).
    pub overall_breached: bool,
    /// Profit reached the phase target (unrounded comparison).
    pub target_reached: bool,
}

/// Live account figures derived from prices, trades and the account
/// snapshot. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub total_floating_pnl: f64,
    pub equity: f64,
    pub used_margin: f64,
    /// `balance - used_margin`; does not move with prices.
    pub free_margin: f64,
    /// `equity / used_margin * 100`, `None` with no margin in use.
    pub margin_level: Option<f64>,
    pub today_pnl: f64,
    pub challenge: Option<ChallengeMetrics>,
}

impl DerivedMetrics {
    /// Display copy with every currency and percentage figure rounded.
    pub fn rounded(&self) -> Self {
        Self {
            total_floating_pnl: round2(self.total_floating_pnl),
            equity: round2(self.equity),
            used_margin: round2(self.used_margin),
            free_margin: round2(self.free_margin),
            margin_level: self.margin_level.map(round2),
            today_pnl: round2(self.today_pnl),
            challenge: self.challenge.map(|c| ChallengeMetrics {
                daily_drawdown_pct: round2(c.daily_drawdown_pct),
                overall_drawdown_pct: round2(c.overall_drawdown_pct),
                profit_pct: round2(c.profit_pct),
                ..c
            }),
        }
    }
}
