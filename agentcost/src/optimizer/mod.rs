//! Cost-optimization analysis.
//!
//! The analyzer consumes per-agent×model aggregates for a lookback window
//! and runs every registered [`OptimizationRule`] against each pair. Rules
//! are trait objects behind one `evaluate` capability: adding or removing a
//! rule never touches the dedup/ranking/summary code below.

pub mod rules;

use crate::db::models::analytics::{StatLine, Window};
use crate::pricing::PricingSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

/// Aggregated usage of one agent×model pair over the lookback window.
#[derive(Debug, Clone)]
pub struct AgentModelStats {
    pub agent_name: String,
    pub model_name: String,
    pub total_calls: i64,
    pub successful_calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    /// Priced window cost in nano-USD; unpriced events contribute nothing
    pub cost_nanos: i64,
    pub avg_latency_ms: f64,
}

impl AgentModelStats {
    /// Build from an agent×model [`StatLine`]. Lines without both grouping
    /// keys (which the agent×model query shape always produces) are skipped.
    pub fn from_stat_line(line: &StatLine) -> Option<Self> {
        Some(Self {
            agent_name: line.key_a.clone()?,
            model_name: line.key_b.clone()?,
            total_calls: line.total_calls,
            successful_calls: line.successful_calls,
            input_tokens: line.input_tokens,
            output_tokens: line.output_tokens,
            cost_nanos: line.cost_nanos_or_zero(),
            avg_latency_ms: line.avg_latency_or_zero(),
        })
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.successful_calls as f64 / self.total_calls as f64 * 100.0
    }

    pub fn avg_output_tokens(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.output_tokens as f64 / self.total_calls as f64
    }
}

/// What kind of opportunity a suggestion describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    ModelDowngrade,
    HighFailureRate,
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionType::ModelDowngrade => f.write_str("model_downgrade"),
            SuggestionType::HighFailureRate => f.write_str("high_failure_rate"),
        }
    }
}

/// Priority tier, assigned from fixed monthly-savings thresholds
/// (≥ $50 high, ≥ $10 medium) or set directly by zero-savings rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Priority tier for a savings-bearing suggestion.
pub fn priority_for_savings(monthly_savings: Decimal) -> Priority {
    if monthly_savings >= Decimal::from(50) {
        Priority::High
    } else if monthly_savings >= Decimal::from(10) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// A cost-optimization recommendation. Ephemeral: recomputed per request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub agent_name: String,
    pub model: String,
    pub alternative_model: Option<String>,
    /// Estimated monthly savings in USD
    #[schema(value_type = String)]
    pub estimated_savings_monthly: Decimal,
    pub estimated_savings_percent: f64,
    pub priority: Priority,
    pub metrics: serde_json::Value,
}

/// Shared inputs available to every rule evaluation.
pub struct RuleContext<'a> {
    pub pricing: &'a PricingSnapshot,
    pub window: Window,
    pub now: DateTime<Utc>,
}

impl RuleContext<'_> {
    /// Extrapolate a window amount to a 30-day equivalent.
    pub fn monthly(&self, window_amount: Decimal) -> Decimal {
        window_amount / Decimal::from(self.window.span_days()) * Decimal::from(30)
    }
}

/// One heuristic over an agent×model pair's aggregated stats.
pub trait OptimizationRule: Send + Sync {
    fn kind(&self) -> SuggestionType;

    /// Evaluate the rule; `None` means no opportunity found.
    fn evaluate(&self, stats: &AgentModelStats, ctx: &RuleContext<'_>) -> Option<Suggestion>;
}

/// The rules shipped by default.
pub fn default_rules() -> Vec<Box<dyn OptimizationRule>> {
    vec![
        Box::new(rules::ModelDowngrade::default()),
        Box::new(rules::HighFailureRate::default()),
    ]
}

/// Run every rule over every agent×model pair, deduplicate by
/// (agent, rule kind) keeping the largest savings, and rank by estimated
/// monthly savings descending.
pub fn analyze(
    stats: &[AgentModelStats],
    ctx: &RuleContext<'_>,
    rules: &[Box<dyn OptimizationRule>],
) -> Vec<Suggestion> {
    let mut best: HashMap<(String, SuggestionType), Suggestion> = HashMap::new();

    for pair in stats {
        for rule in rules {
            if let Some(suggestion) = rule.evaluate(pair, ctx) {
                let key = (suggestion.agent_name.clone(), suggestion.suggestion_type);
                match best.get(&key) {
                    Some(existing) if existing.estimated_savings_monthly >= suggestion.estimated_savings_monthly => {}
                    _ => {
                        best.insert(key, suggestion);
                    }
                }
            }
        }
    }

    let mut suggestions: Vec<Suggestion> = best.into_values().collect();
    suggestions.sort_by(|a, b| {
        b.estimated_savings_monthly
            .cmp(&a.estimated_savings_monthly)
            .then_with(|| a.agent_name.cmp(&b.agent_name))
    });
    suggestions
}

/// Reduction over the current suggestion set plus spend context.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavingsSummary {
    /// Sum of estimated monthly savings across all current suggestions, USD
    #[schema(value_type = String)]
    pub total_potential_savings_monthly: Decimal,
    pub total_potential_savings_percent: f64,
    /// Current spend extrapolated to 30 days, USD
    #[schema(value_type = String)]
    pub current_monthly_spend: Decimal,
    pub suggestion_count: usize,
    pub high_priority_count: usize,
    /// Suggestion counts and savings keyed by suggestion type
    pub by_type: HashMap<String, TypeBreakdown>,
    /// Top suggestions by estimated savings
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TypeBreakdown {
    pub count: usize,
    #[schema(value_type = String)]
    pub estimated_savings_monthly: Decimal,
}

/// Fold a ranked suggestion list into the summary shape.
pub fn summarize(suggestions: Vec<Suggestion>, current_monthly_spend: Decimal) -> SavingsSummary {
    let total: Decimal = suggestions.iter().map(|s| s.estimated_savings_monthly).sum();
    let high_priority_count = suggestions.iter().filter(|s| s.priority == Priority::High).count();

    let mut by_type: HashMap<String, TypeBreakdown> = HashMap::new();
    for s in &suggestions {
        let entry = by_type.entry(s.suggestion_type.to_string()).or_default();
        entry.count += 1;
        entry.estimated_savings_monthly += s.estimated_savings_monthly;
    }

    let percent = if current_monthly_spend > Decimal::ZERO {
        (total / current_monthly_spend * Decimal::from(100))
            .round_dp(1)
            .to_f64()
            .unwrap_or(0.0)
    } else {
        0.0
    };

    SavingsSummary {
        total_potential_savings_monthly: total.round_dp(2),
        total_potential_savings_percent: percent,
        current_monthly_spend: current_monthly_spend.round_dp(2),
        suggestion_count: suggestions.len(),
        high_priority_count,
        by_type,
        suggestions: suggestions.into_iter().take(5).collect(),
    }
}
