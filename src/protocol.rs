//! Public request/response structs for the HTTP boundary (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::model::{EvaluationResult, GameState, MultiRoundEvaluationResult, ScenarioCompletion};

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub scenario: Option<String>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioQuery {
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Deserialize)]
pub struct RespondIn {
    pub parent_response: String,
}

#[derive(Serialize)]
pub struct ScenarioSnapshot {
    pub title: String,
    pub background: String,
    pub teen_opening: String,
    pub is_multi_round: bool,
}

#[derive(Serialize)]
pub struct StartOut {
    pub session_id: String,
    pub scenario: ScenarioSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
}

pub fn start_out(session_id: String, state: &GameState) -> StartOut {
    let mut out = StartOut {
        session_id,
        scenario: ScenarioSnapshot {
            title: state.scenario_title.clone(),
            background: state.scenario_background.clone(),
            teen_opening: state.teen_opening.clone(),
            is_multi_round: state.is_multi_round,
        },
        current_round: None,
        max_rounds: None,
        round_attempts_remaining: None,
        attempts_remaining: None,
    };
    if state.is_multi_round {
        out.current_round = Some(state.current_round);
        out.max_rounds = Some(state.max_rounds);
        out.round_attempts_remaining = Some(state.max_round_attempts - state.round_attempts);
    } else {
        out.attempts_remaining = Some(state.max_attempts - state.attempts);
    }
    out
}

#[derive(Serialize)]
pub struct RoundSummary {
    pub round_number: u32,
    pub passed: bool,
    pub score: i32,
    pub attempts_used: u32,
}

/// Per-request view of a session, returned by respond/advance.
#[derive(Serialize)]
pub struct GameView {
    pub is_multi_round: bool,
    pub teen_opening: String,
    pub teen_response: Option<String>,
    pub game_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_round_evaluation: Option<MultiRoundEvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_attempts_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_completion: Option<ScenarioCompletion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rounds_summary: Vec<RoundSummary>,
}

pub fn game_view(state: &GameState) -> GameView {
    let mut view = GameView {
        is_multi_round: state.is_multi_round,
        teen_opening: state.teen_opening.clone(),
        teen_response: state.teen_response.clone(),
        game_completed: state.game_completed,
        final_score: state.final_score,
        evaluation: None,
        attempts_used: None,
        attempts_remaining: None,
        multi_round_evaluation: None,
        current_round: None,
        max_rounds: None,
        round_attempts_used: None,
        round_attempts_remaining: None,
        scenario_completion: state.scenario_completion.clone(),
        rounds_summary: state
            .round_history
            .iter()
            .map(|r| RoundSummary {
                round_number: r.round_number,
                passed: r.evaluation.passed,
                score: r.evaluation.total_score,
                attempts_used: r.attempts_used,
            })
            .collect(),
    };
    if state.is_multi_round {
        view.multi_round_evaluation = state.multi_round_evaluation.clone();
        view.current_round = Some(state.current_round);
        view.max_rounds = Some(state.max_rounds);
        view.round_attempts_used = Some(state.round_attempts);
        view.round_attempts_remaining = Some(state.max_round_attempts - state.round_attempts);
    } else {
        view.evaluation = state.evaluation.clone();
        view.attempts_used = Some(state.attempts);
        view.attempts_remaining = Some(state.max_attempts - state.attempts);
    }
    view
}

#[derive(Serialize)]
pub struct ScenarioOut {
    pub id: String,
    pub title: String,
    pub background: String,
    pub teen_opening: String,
    pub round_count: u32,
    pub is_multi_round: bool,
}

#[derive(Serialize)]
pub struct ScenariosOut {
    pub scenarios: Vec<String>,
}

#[derive(Serialize)]
pub struct EndOut {
    pub ended: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_round_view_omits_round_fields() {
        let state = GameState::new(
            "Messy Room".into(),
            "bg".into(),
            "opening".into(),
            false,
            1,
            3,
            3,
            Locale::En,
        );
        let json = serde_json::to_string(&game_view(&state)).unwrap();
        assert!(json.contains("attempts_remaining"));
        assert!(!json.contains("round_attempts_remaining"));
        assert!(!json.contains("rounds_summary"));
    }
}
