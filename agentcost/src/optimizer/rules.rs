//! The built-in optimization rules.

use super::{AgentModelStats, OptimizationRule, Priority, RuleContext, Suggestion, SuggestionType, priority_for_savings};
use crate::pricing::cost;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::json;

/// Pairs with fewer calls than this are too thin to recommend anything on.
const MIN_CALLS: i64 = 10;

/// Suggest switching an agent to the catalog's cheaper downgrade target when
/// its average output length suggests the premium model is underused.
pub struct ModelDowngrade {
    /// Only agents averaging at most this many output tokens per call are
    /// downgrade candidates
    pub max_avg_output_tokens: f64,
    /// Window cost floor below which the pair is ignored, nano-USD
    pub min_window_cost_nanos: i64,
    /// Suggestions saving less than this per month are dropped, USD
    pub min_monthly_savings: Decimal,
}

impl Default for ModelDowngrade {
    fn default() -> Self {
        Self {
            max_avg_output_tokens: 200.0,
            min_window_cost_nanos: 10_000_000, // $0.01
            min_monthly_savings: Decimal::ONE,
        }
    }
}

impl OptimizationRule for ModelDowngrade {
    fn kind(&self) -> SuggestionType {
        SuggestionType::ModelDowngrade
    }

    fn evaluate(&self, stats: &AgentModelStats, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        if stats.total_calls < MIN_CALLS || stats.cost_nanos < self.min_window_cost_nanos {
            return None;
        }

        let avg_output = stats.avg_output_tokens();
        if avg_output > self.max_avg_output_tokens {
            return None;
        }

        let candidate = ctx.pricing.downgrade_candidate(&stats.model_name)?.to_string();
        let candidate_quote = ctx.pricing.resolve(&candidate, ctx.now)?;

        // Reprice the window's actual token volumes at the candidate's
        // current quote and extrapolate the delta to 30 days.
        let current_cost = cost::from_nanos(stats.cost_nanos);
        let candidate_cost = cost::event_cost(stats.input_tokens, stats.output_tokens, candidate_quote);
        let window_savings = current_cost - candidate_cost;
        if window_savings <= Decimal::ZERO {
            return None;
        }

        let monthly_savings = ctx.monthly(window_savings);
        if monthly_savings < self.min_monthly_savings {
            return None;
        }

        let monthly_cost = ctx.monthly(current_cost);
        let savings_percent = if monthly_cost > Decimal::ZERO {
            (monthly_savings / monthly_cost * Decimal::from(100))
                .round_dp(1)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Some(Suggestion {
            suggestion_type: self.kind(),
            title: format!("Consider {candidate} for {}", stats.agent_name),
            description: format!(
                "Agent '{}' uses {} with an average output of {:.0} tokens per call. \
                 Switching to {candidate} could reduce costs by an estimated ${:.2}/month.",
                stats.agent_name,
                stats.model_name,
                avg_output,
                monthly_savings.round_dp(2),
            ),
            agent_name: stats.agent_name.clone(),
            model: stats.model_name.clone(),
            alternative_model: Some(candidate),
            priority: priority_for_savings(monthly_savings),
            estimated_savings_monthly: monthly_savings.round_dp(2),
            estimated_savings_percent: savings_percent,
            metrics: json!({
                "total_calls": stats.total_calls,
                "avg_output_tokens": (avg_output * 10.0).round() / 10.0,
                "window_cost": current_cost.round_dp(4),
                "window_cost_at_candidate": candidate_cost.round_dp(4),
                "monthly_cost": monthly_cost.round_dp(2),
            }),
        })
    }
}

/// Flag agents whose failure rate is burning spend; an investigation
/// suggestion without a savings estimate.
pub struct HighFailureRate {
    /// Success-rate floor in percent; pairs below it are flagged
    pub min_success_rate: f64,
}

impl Default for HighFailureRate {
    fn default() -> Self {
        Self { min_success_rate: 90.0 }
    }
}

impl OptimizationRule for HighFailureRate {
    fn kind(&self) -> SuggestionType {
        SuggestionType::HighFailureRate
    }

    fn evaluate(&self, stats: &AgentModelStats, ctx: &RuleContext<'_>) -> Option<Suggestion> {
        let _ = ctx;
        if stats.total_calls < MIN_CALLS {
            return None;
        }

        let success_rate = stats.success_rate();
        if success_rate >= self.min_success_rate {
            return None;
        }

        let failed = stats.total_calls - stats.successful_calls;
        let failure_rate = 100.0 - success_rate;

        Some(Suggestion {
            suggestion_type: self.kind(),
            title: format!("Investigate failures in {}", stats.agent_name),
            description: format!(
                "Agent '{}' using {} failed {failed} of {} calls ({failure_rate:.1}% failure rate). \
                 Failed calls still consume tokens; investigate error causes before they compound.",
                stats.agent_name, stats.model_name, stats.total_calls,
            ),
            agent_name: stats.agent_name.clone(),
            model: stats.model_name.clone(),
            alternative_model: None,
            estimated_savings_monthly: Decimal::ZERO,
            estimated_savings_percent: 0.0,
            priority: if failure_rate >= 25.0 { Priority::High } else { Priority::Medium },
            metrics: json!({
                "total_calls": stats.total_calls,
                "failed_calls": failed,
                "success_rate": (success_rate * 100.0).round() / 100.0,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::analytics::Window;
    use crate::db::models::pricing::{PriceQuote, QuoteOrigin};
    use crate::pricing::PricingSnapshot;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::str::FromStr;
    use uuid::Uuid;

    fn quote(model: &str, input: &str, output: &str) -> PriceQuote {
        PriceQuote {
            id: Uuid::new_v4(),
            model_name: model.to_string(),
            provider: None,
            input_price_per_token: Decimal::from_str(input).unwrap(),
            output_price_per_token: Decimal::from_str(output).unwrap(),
            currency: "USD".to_string(),
            origin: QuoteOrigin::Default,
            valid_from: chrono::DateTime::UNIX_EPOCH,
            valid_until: None,
            created_at: Utc::now(),
        }
    }

    fn gpt4_snapshot() -> PricingSnapshot {
        let hints: HashMap<String, String> = [("gpt-4".to_string(), "gpt-3.5-turbo".to_string())].into();
        PricingSnapshot::build(
            vec![
                quote("gpt-4", "0.00003", "0.00006"),
                quote("gpt-3.5-turbo", "0.0000015", "0.000002"),
            ],
            &hints,
        )
    }

    fn stats(calls: i64, successful: i64, input: i64, output: i64, cost_nanos: i64) -> AgentModelStats {
        AgentModelStats {
            agent_name: "summarizer".to_string(),
            model_name: "gpt-4".to_string(),
            total_calls: calls,
            successful_calls: successful,
            input_tokens: input,
            output_tokens: output,
            cost_nanos,
            avg_latency_ms: 800.0,
        }
    }

    fn ctx(snapshot: &PricingSnapshot) -> RuleContext<'_> {
        let now = Utc::now();
        RuleContext {
            pricing: snapshot,
            window: Window {
                start: now - Duration::days(30),
                end: now,
            },
            now,
        }
    }

    #[test]
    fn short_output_premium_model_gets_downgrade_suggestion() {
        let snapshot = gpt4_snapshot();
        let ctx = ctx(&snapshot);
        // 1000 calls, avg 50 output tokens, $33/window on gpt-4
        let pair = stats(1000, 1000, 1_000_000, 50_000, 33_000_000_000);

        let suggestion = ModelDowngrade::default().evaluate(&pair, &ctx).unwrap();
        assert_eq!(suggestion.alternative_model.as_deref(), Some("gpt-3.5-turbo"));
        assert!(suggestion.estimated_savings_monthly > Decimal::ZERO);
        assert!(suggestion.estimated_savings_percent > 0.0);
    }

    #[test]
    fn long_output_agents_are_left_alone() {
        let snapshot = gpt4_snapshot();
        let ctx = ctx(&snapshot);
        // avg 2000 output tokens per call
        let pair = stats(100, 100, 100_000, 200_000, 10_000_000_000);

        assert!(ModelDowngrade::default().evaluate(&pair, &ctx).is_none());
    }

    #[test]
    fn thin_usage_is_ignored() {
        let snapshot = gpt4_snapshot();
        let ctx = ctx(&snapshot);
        let pair = stats(3, 3, 300, 150, 100_000);

        assert!(ModelDowngrade::default().evaluate(&pair, &ctx).is_none());
        assert!(HighFailureRate::default().evaluate(&pair, &ctx).is_none());
    }

    #[test]
    fn failure_rate_below_threshold_is_flagged_without_savings() {
        let snapshot = gpt4_snapshot();
        let ctx = ctx(&snapshot);
        let pair = stats(100, 60, 100_000, 50_000, 5_000_000_000);

        let suggestion = HighFailureRate::default().evaluate(&pair, &ctx).unwrap();
        assert_eq!(suggestion.estimated_savings_monthly, Decimal::ZERO);
        assert_eq!(suggestion.priority, Priority::High);
    }
}
