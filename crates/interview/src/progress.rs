//! Conversation progress tracking.
//!
//! The only state an interview has is the history the caller sends back, so
//! the stage is recomputed on every request from the number of candidate
//! turns. Each stage carries an instruction for the interviewer and an
//! output token budget.

use prepwire_config::InterviewConfig;
use prepwire_core::message::{Turn, count_user_turns};
use serde::Serialize;

/// Interview stage, ordered from opening to conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Initial,
    Early,
    NearingEnd,
    Final,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Initial => "initial",
            Tier::Early => "early",
            Tier::NearingEnd => "nearing-end",
            Tier::Final => "final",
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Tier::Initial => INITIAL_DIRECTIVE,
            Tier::Early => EARLY_DIRECTIVE,
            Tier::NearingEnd => NEARING_END_DIRECTIVE,
            Tier::Final => FINAL_DIRECTIVE,
        }
    }
}

const INITIAL_DIRECTIVE: &str = "The interview is starting. Greet the candidate in one short \
sentence, then ask exactly one opening question.";
const EARLY_DIRECTIVE: &str = "Acknowledge the last answer briefly, then ask exactly one next \
question. Make sure every evaluation category is covered before the interview concludes.";
const NEARING_END_DIRECTIVE: &str = "The interview is nearly over. If you have not asked your \
closing question yet, ask it now. Still exactly one question.";
const FINAL_DIRECTIVE: &str = "The interview is over. Do not ask another question. Thank the \
candidate and write the feedback block between the markers described above.";

/// Output token budgets per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBudgets {
    pub initial: u32,
    pub early: u32,
    pub nearing_end: u32,
    pub concluding: u32,
}

impl Default for TierBudgets {
    fn default() -> Self {
        Self {
            initial: 300,
            early: 450,
            nearing_end: 450,
            concluding: 2000,
        }
    }
}

/// Thresholds and budgets for classification.
///
/// Config validation guarantees `nearing_end_after < final_after` and
/// non-decreasing budgets, which is what keeps classification monotonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressPolicy {
    /// Candidate turns above this count are nearing the end.
    pub nearing_end_after: usize,
    /// Candidate turns at or above this count conclude the interview.
    pub final_after: usize,
    pub budgets: TierBudgets,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            nearing_end_after: 7,
            final_after: 9,
            budgets: TierBudgets::default(),
        }
    }
}

impl From<&InterviewConfig> for ProgressPolicy {
    fn from(config: &InterviewConfig) -> Self {
        Self {
            nearing_end_after: config.nearing_end_after,
            final_after: config.final_after,
            budgets: TierBudgets {
                initial: config.budgets.initial,
                early: config.budgets.early,
                nearing_end: config.budgets.nearing_end,
                concluding: config.budgets.concluding,
            },
        }
    }
}

impl ProgressPolicy {
    pub fn tier_for(&self, user_turns: usize) -> Tier {
        if user_turns == 0 {
            Tier::Initial
        } else if user_turns >= self.final_after {
            Tier::Final
        } else if user_turns > self.nearing_end_after {
            Tier::NearingEnd
        } else {
            Tier::Early
        }
    }

    pub fn budget(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Initial => self.budgets.initial,
            Tier::Early => self.budgets.early,
            Tier::NearingEnd => self.budgets.nearing_end,
            Tier::Final => self.budgets.concluding,
        }
    }
}

/// Where a conversation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub tier: Tier,
    pub user_turns: usize,
    /// Turn count at which the interview concludes.
    pub final_after: usize,
    pub directive: &'static str,
    pub max_tokens: u32,
    /// Only the final tier asks for the feedback block.
    pub expects_feedback: bool,
}

/// Classify a history. Total: every history maps to exactly one tier.
pub fn classify(turns: &[Turn], policy: &ProgressPolicy) -> Progress {
    let user_turns = count_user_turns(turns);
    let tier = policy.tier_for(user_turns);

    Progress {
        tier,
        user_turns,
        final_after: policy.final_after,
        directive: tier.directive(),
        max_tokens: policy.budget(tier),
        expects_feedback: tier == Tier::Final,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(user_turns: usize) -> Vec<Turn> {
        let mut turns = vec![Turn::assistant("Welcome. Tell me about yourself.")];
        for i in 0..user_turns {
            turns.push(Turn::user(format!("answer {i}")));
            turns.push(Turn::assistant(format!("question {i}")));
        }
        turns
    }

    #[test]
    fn tier_boundaries() {
        let policy = ProgressPolicy::default();
        assert_eq!(classify(&history(0), &policy).tier, Tier::Initial);
        assert_eq!(classify(&history(1), &policy).tier, Tier::Early);
        assert_eq!(classify(&history(7), &policy).tier, Tier::Early);
        assert_eq!(classify(&history(8), &policy).tier, Tier::NearingEnd);
        assert_eq!(classify(&history(9), &policy).tier, Tier::Final);
        assert_eq!(classify(&history(40), &policy).tier, Tier::Final);
    }

    #[test]
    fn only_user_turns_count() {
        let turns = vec![
            Turn::assistant("a"),
            Turn::assistant("b"),
            Turn::user("c"),
            Turn::assistant("d"),
        ];
        let progress = classify(&turns, &ProgressPolicy::default());
        assert_eq!(progress.user_turns, 1);
        assert_eq!(progress.tier, Tier::Early);
    }

    #[test]
    fn budgets_per_tier() {
        let policy = ProgressPolicy::default();
        assert_eq!(classify(&history(0), &policy).max_tokens, 300);
        assert_eq!(classify(&history(3), &policy).max_tokens, 450);
        assert_eq!(classify(&history(8), &policy).max_tokens, 450);
        assert_eq!(classify(&history(9), &policy).max_tokens, 2000);
    }

    #[test]
    fn classification_is_monotonic() {
        let policy = ProgressPolicy::default();
        let mut previous = classify(&history(0), &policy);
        for n in 1..=30 {
            let current = classify(&history(n), &policy);
            assert!(current.tier >= previous.tier, "tier regressed at {n}");
            assert!(current.max_tokens >= previous.max_tokens, "budget regressed at {n}");
            previous = current;
        }
    }

    #[test]
    fn only_final_expects_feedback() {
        let policy = ProgressPolicy::default();
        for n in 0..9 {
            assert!(!classify(&history(n), &policy).expects_feedback);
        }
        let last = classify(&history(9), &policy);
        assert!(last.expects_feedback);
        assert!(last.directive.contains("Do not ask another question"));
    }

    #[test]
    fn policy_from_config() {
        let mut config = InterviewConfig::default();
        config.nearing_end_after = 3;
        config.final_after = 5;
        config.budgets.concluding = 1500;
        let policy = ProgressPolicy::from(&config);
        assert_eq!(policy.tier_for(4), Tier::NearingEnd);
        assert_eq!(policy.tier_for(5), Tier::Final);
        assert_eq!(policy.budget(Tier::Final), 1500);
    }

    #[test]
    fn default_policy_matches_config_defaults() {
        assert_eq!(
            ProgressPolicy::from(&InterviewConfig::default()),
            ProgressPolicy::default()
        );
    }
}
