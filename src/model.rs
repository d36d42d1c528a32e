//! All record types for the roleplay game, defined up front:
//! evaluation criteria and results, per-round records, completion summary,
//! and the mutable `GameState` itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

/// Named evaluation criterion used by multi-round rubrics.
///
/// Scenario documents refer to criteria by name; unknown names are kept
/// verbatim in `Other` and score out of the default maximum of 3.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Criterion {
    EmotionAcknowledgment,
    ToneEmpathy,
    SolutionApproach,
    FearValidation,
    ConcreteReassurance,
    CollaborativeApproach,
    TransitionStrategy,
    ChildAgency,
    FollowThroughClarity,
    Other(String),
}

impl Criterion {
    pub fn name(&self) -> &str {
        match self {
            Criterion::EmotionAcknowledgment => "emotion_acknowledgment",
            Criterion::ToneEmpathy => "tone_empathy",
            Criterion::SolutionApproach => "solution_approach",
            Criterion::FearValidation => "fear_validation",
            Criterion::ConcreteReassurance => "concrete_reassurance",
            Criterion::CollaborativeApproach => "collaborative_approach",
            Criterion::TransitionStrategy => "transition_strategy",
            Criterion::ChildAgency => "child_agency",
            Criterion::FollowThroughClarity => "follow_through_clarity",
            Criterion::Other(name) => name,
        }
    }

    /// Maximum attainable score for this criterion.
    /// Unknown criteria default to 3.
    pub fn max_score(&self) -> i32 {
        match self {
            Criterion::ToneEmpathy => 2,
            Criterion::FearValidation | Criterion::TransitionStrategy => 4,
            _ => 3,
        }
    }
}

impl From<String> for Criterion {
    fn from(s: String) -> Self {
        match s.as_str() {
            "emotion_acknowledgment" => Criterion::EmotionAcknowledgment,
            "tone_empathy" => Criterion::ToneEmpathy,
            "solution_approach" => Criterion::SolutionApproach,
            "fear_validation" => Criterion::FearValidation,
            "concrete_reassurance" => Criterion::ConcreteReassurance,
            "collaborative_approach" => Criterion::CollaborativeApproach,
            "transition_strategy" => Criterion::TransitionStrategy,
            "child_agency" => Criterion::ChildAgency,
            "follow_through_clarity" => Criterion::FollowThroughClarity,
            _ => Criterion::Other(s),
        }
    }
}

impl From<Criterion> for String {
    fn from(c: Criterion) -> Self {
        c.name().to_string()
    }
}

/// Total maximum score for a round's criteria set.
pub fn max_possible_score(criteria: &[Criterion]) -> i32 {
    criteria.iter().map(Criterion::max_score).sum()
}

/// Result of evaluating a parent's response against the fixed
/// single-round rubric (tone 0-4, approach 0-3, respect 0-3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub tone_score: i32,
    pub approach_score: i32,
    pub respect_score: i32,
    pub total_score: i32,
    pub feedback: String,
    pub passed: bool,
}

/// Result of evaluating one round of a multi-round scenario against its
/// dynamic criteria set. `max_possible_score` and `passed` are always
/// recomputed server-side, never taken from the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiRoundEvaluationResult {
    pub criteria_scores: BTreeMap<Criterion, i32>,
    pub total_score: i32,
    pub max_possible_score: i32,
    pub feedback: String,
    pub detailed_feedback: BTreeMap<Criterion, String>,
    pub passed: bool,
    pub round_number: u32,
}

/// In-character reply from the simulated teenager.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeenReply {
    pub response: String,
    #[serde(default = "default_emotion")]
    pub emotion: String,
}

fn default_emotion() -> String {
    "neutral".to_string()
}

/// Immutable record of one resolved round.
#[derive(Clone, Debug, Serialize)]
pub struct RoundResult {
    pub round_number: u32,
    pub parent_response: String,
    pub child_response: String,
    pub evaluation: MultiRoundEvaluationResult,
    pub attempts_used: u32,
    pub completed_at: DateTime<Utc>,
}

/// Summary computed once when the final round of a scenario resolves.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioCompletion {
    pub scenario_name: String,
    pub rounds_completed: u32,
    pub total_rounds: u32,
    pub rounds_passed: u32,
    /// Mean score over passed rounds only; 0 when no round passed.
    pub overall_score: f64,
    pub mastery_achieved: bool,
    pub badges_earned: Vec<String>,
    pub communication_techniques_unlocked: Vec<String>,
}

/// Mutable progress record for one playthrough. Owned by the engine;
/// exactly one of the single-round / multi-round field groups is active,
/// fixed by `is_multi_round` at creation.
#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    // Scenario snapshot
    pub scenario_title: String,
    pub scenario_background: String,
    pub teen_opening: String,
    pub is_multi_round: bool,
    pub locale: Locale,

    // Single-round progress (legacy)
    pub parent_response: String,
    pub attempts: u32,
    pub max_attempts: u32,

    // Multi-round progress
    pub current_round: u32,
    pub max_rounds: u32,
    pub round_attempts: u32,
    pub max_round_attempts: u32,
    pub round_history: Vec<RoundResult>,

    // Results
    pub evaluation: Option<EvaluationResult>,
    pub multi_round_evaluation: Option<MultiRoundEvaluationResult>,
    pub teen_response: Option<String>,
    pub game_completed: bool,
    pub final_score: Option<i32>,
    pub scenario_completion: Option<ScenarioCompletion>,
}

impl GameState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scenario_title: String,
        scenario_background: String,
        teen_opening: String,
        is_multi_round: bool,
        max_rounds: u32,
        max_attempts: u32,
        max_round_attempts: u32,
        locale: Locale,
    ) -> Self {
        Self {
            scenario_title,
            scenario_background,
            teen_opening,
            is_multi_round,
            locale,
            parent_response: String::new(),
            attempts: 0,
            max_attempts,
            current_round: 1,
            max_rounds,
            round_attempts: 0,
            max_round_attempts,
            round_history: Vec::new(),
            evaluation: None,
            multi_round_evaluation: None,
            teen_response: None,
            game_completed: false,
            final_score: None,
            scenario_completion: None,
        }
    }

    /// Whether another attempt is allowed for the active round / game.
    pub fn can_retry(&self) -> bool {
        if self.is_multi_round {
            self.round_attempts < self.max_round_attempts && !self.game_completed
        } else {
            self.attempts < self.max_attempts && !self.game_completed
        }
    }

    /// Whether the latest evaluation passed.
    pub fn is_passed(&self) -> bool {
        if self.is_multi_round {
            self.multi_round_evaluation.as_ref().is_some_and(|e| e.passed)
        } else {
            self.evaluation.as_ref().is_some_and(|e| e.passed)
        }
    }

    /// Count the submission that is about to be evaluated.
    pub fn increment_attempt(&mut self) {
        if self.is_multi_round {
            self.round_attempts += 1;
        } else {
            self.attempts += 1;
        }
    }

    /// Move to the next round, clearing per-round fields.
    pub fn advance_to_next_round(&mut self) {
        if self.is_multi_round && self.current_round < self.max_rounds {
            self.current_round += 1;
            self.round_attempts = 0;
            self.parent_response.clear();
            self.teen_response = None;
            self.multi_round_evaluation = None;
        }
    }

    /// Whether the current round has resolved and more rounds remain.
    pub fn can_advance_round(&self) -> bool {
        self.is_multi_round
            && self.current_round < self.max_rounds
            && (self.is_passed() || self.round_attempts >= self.max_round_attempts)
    }

    /// Mark the game as terminal. `final_score` stays unset when a
    /// single-round game ends by attempt exhaustion without a pass.
    pub fn complete_game(&mut self, final_score: Option<i32>) {
        self.game_completed = true;
        self.final_score = final_score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_max_scores() {
        assert_eq!(Criterion::ToneEmpathy.max_score(), 2);
        assert_eq!(Criterion::FearValidation.max_score(), 4);
        assert_eq!(Criterion::TransitionStrategy.max_score(), 4);
        assert_eq!(Criterion::SolutionApproach.max_score(), 3);
        assert_eq!(Criterion::Other("mystery".into()).max_score(), 3);
    }

    #[test]
    fn criterion_name_round_trip() {
        let c = Criterion::from("fear_validation".to_string());
        assert_eq!(c, Criterion::FearValidation);
        assert_eq!(c.name(), "fear_validation");
        let other = Criterion::from("grit".to_string());
        assert_eq!(other, Criterion::Other("grit".into()));
        assert_eq!(other.name(), "grit");
    }

    #[test]
    fn max_possible_uses_table() {
        let criteria = vec![
            Criterion::FearValidation,
            Criterion::ConcreteReassurance,
            Criterion::CollaborativeApproach,
        ];
        assert_eq!(max_possible_score(&criteria), 10);
        let r1 = vec![
            Criterion::EmotionAcknowledgment,
            Criterion::ToneEmpathy,
            Criterion::SolutionApproach,
        ];
        assert_eq!(max_possible_score(&r1), 8);
    }

    fn multi_state() -> GameState {
        GameState::new(
            "School Drop-off Anxiety".into(),
            "bg".into(),
            "opening".into(),
            true,
            3,
            3,
            3,
            Locale::En,
        )
    }

    #[test]
    fn attempts_respect_caps() {
        let mut s = multi_state();
        for _ in 0..3 {
            assert!(s.can_retry());
            s.increment_attempt();
        }
        assert_eq!(s.round_attempts, 3);
        assert!(!s.can_retry());
        assert_eq!(s.attempts, 0, "single-round counter untouched in multi-round mode");
    }

    #[test]
    fn advance_resets_round_fields() {
        let mut s = multi_state();
        s.increment_attempt();
        s.parent_response = "please".into();
        s.teen_response = Some("no".into());
        s.round_attempts = 3;
        s.advance_to_next_round();
        assert_eq!(s.current_round, 2);
        assert_eq!(s.round_attempts, 0);
        assert!(s.parent_response.is_empty());
        assert!(s.teen_response.is_none());
        assert!(s.multi_round_evaluation.is_none());
    }

    #[test]
    fn no_advance_past_final_round() {
        let mut s = multi_state();
        s.current_round = 3;
        s.round_attempts = 3;
        assert!(!s.can_advance_round());
        s.advance_to_next_round();
        assert_eq!(s.current_round, 3);
    }

    #[test]
    fn completion_blocks_retry() {
        let mut s = multi_state();
        s.complete_game(Some(9));
        assert!(!s.can_retry());
        assert_eq!(s.final_score, Some(9));
    }

    #[test]
    fn criteria_map_serializes_by_name() {
        let mut scores = BTreeMap::new();
        scores.insert(Criterion::FearValidation, 4);
        scores.insert(Criterion::Other("grit".into()), 2);
        let json = serde_json::to_string(&scores).unwrap();
        assert!(json.contains("\"fear_validation\":4"));
        assert!(json.contains("\"grit\":2"));
    }
}
