//! Evaluation agent: scores a parent's response with the generative model
//! and falls back to a deterministic result when the model is unavailable
//! or returns something unparseable. Gameplay never fails on a model error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, instrument};

use crate::config::Prompts;
use crate::locale::Locale;
use crate::model::{max_possible_score, Criterion, EvaluationResult, MultiRoundEvaluationResult};
use crate::openai::LlmClient;
use crate::util::{fill_template, strip_code_fences};

pub struct EvaluationAgent {
  client: Option<Arc<dyn LlmClient>>,
  model: String,
}

/// What the model is asked to return for a multi-round evaluation.
/// Deliberately has no `passed` or `max_possible_score` field: both are
/// recomputed here so game advancement never depends on model obedience.
#[derive(Deserialize)]
struct MultiEvalRaw {
  #[serde(default)]
  criteria_scores: BTreeMap<Criterion, i32>,
  total_score: i32,
  feedback: String,
  #[serde(default)]
  detailed_feedback: BTreeMap<Criterion, String>,
}

impl EvaluationAgent {
  pub fn new(client: Option<Arc<dyn LlmClient>>, model: String) -> Self {
    Self { client, model }
  }

  async fn chat(&self, system: &str, user: &str) -> Result<String, String> {
    match &self.client {
      Some(client) => client.chat_json(&self.model, system, user, 0.2).await,
      None => Err("model unavailable (no OPENAI_API_KEY)".into()),
    }
  }

  /// Score against the fixed tone/approach/respect rubric.
  #[instrument(level = "info", skip(self, prompts, parent_response, teen_opening), fields(%locale, answer_len = parent_response.len()))]
  pub async fn evaluate_single(
    &self,
    prompts: &Prompts,
    parent_response: &str,
    teen_opening: &str,
    locale: Locale,
  ) -> EvaluationResult {
    let user = fill_template(
      prompts.eval_user.get(locale),
      &[("parent_response", parent_response), ("teen_opening", teen_opening)],
    );

    let parsed = match self.chat(&prompts.eval_system, &user).await {
      Ok(raw) => serde_json::from_str::<EvaluationResult>(strip_code_fences(&raw))
        .map_err(|e| format!("JSON parse error: {}", e)),
      Err(e) => Err(e),
    };

    match parsed {
      Ok(result) => result,
      Err(e) => {
        error!(target: "roleplay", error = %e, "Evaluation failed; using fallback");
        fallback_single(&e, locale)
      }
    }
  }

  /// Score against one round's dynamic criteria. `max_possible_score` comes
  /// from the criterion table and `passed` from the caller's threshold; the
  /// model's own claims about either are discarded.
  #[instrument(level = "info", skip(self, prompts, parent_response, child_prompt), fields(%locale, round = round_number, answer_len = parent_response.len()))]
  pub async fn evaluate_multi_round(
    &self,
    prompts: &Prompts,
    parent_response: &str,
    child_prompt: &str,
    criteria: &[Criterion],
    threshold: i32,
    round_number: u32,
    locale: Locale,
  ) -> MultiRoundEvaluationResult {
    let criteria_desc =
      criteria.iter().map(Criterion::name).collect::<Vec<_>>().join(", ");
    let round = round_number.to_string();
    let threshold_s = threshold.to_string();
    let user = fill_template(
      prompts.multi_eval_user.get(locale),
      &[
        ("round", &round),
        ("parent_response", parent_response),
        ("child_prompt", child_prompt),
        ("criteria", &criteria_desc),
        ("threshold", &threshold_s),
      ],
    );

    let parsed = match self.chat(&prompts.multi_eval_system, &user).await {
      Ok(raw) => serde_json::from_str::<MultiEvalRaw>(strip_code_fences(&raw))
        .map_err(|e| format!("JSON parse error: {}", e)),
      Err(e) => Err(e),
    };

    match parsed {
      Ok(raw) => MultiRoundEvaluationResult {
        criteria_scores: raw.criteria_scores,
        total_score: raw.total_score,
        max_possible_score: max_possible_score(criteria),
        feedback: raw.feedback,
        detailed_feedback: raw.detailed_feedback,
        passed: raw.total_score >= threshold,
        round_number,
      },
      Err(e) => {
        error!(target: "roleplay", round = round_number, error = %e, "Multi-round evaluation failed; using fallback");
        fallback_multi_round(&e, criteria, round_number, locale)
      }
    }
  }
}

fn error_notice(error: &str, locale: Locale) -> String {
  match locale {
    Locale::En => format!("Evaluation system error, please retry. Error: {}", error),
    Locale::ZhHk => format!("評估系統出現錯誤，請重試。錯誤：{}", error),
  }
}

/// Fixed low-but-valid score so the caller always gets a usable result.
fn fallback_single(error: &str, locale: Locale) -> EvaluationResult {
  EvaluationResult {
    tone_score: 2,
    approach_score: 2,
    respect_score: 2,
    total_score: 6,
    feedback: error_notice(error, locale),
    passed: false,
  }
}

/// Flat score of 2 per criterion, never passing.
fn fallback_multi_round(
  error: &str,
  criteria: &[Criterion],
  round_number: u32,
  locale: Locale,
) -> MultiRoundEvaluationResult {
  let criteria_scores: BTreeMap<Criterion, i32> =
    criteria.iter().map(|c| (c.clone(), 2)).collect();
  let total_score = criteria_scores.values().sum();
  let note = match locale {
    Locale::En => "System error",
    Locale::ZhHk => "系統錯誤",
  };
  let detailed_feedback =
    criteria.iter().map(|c| (c.clone(), note.to_string())).collect();

  MultiRoundEvaluationResult {
    criteria_scores,
    total_score,
    max_possible_score: criteria.len() as i32 * 3,
    feedback: error_notice(error, locale),
    detailed_feedback,
    passed: false,
    round_number,
  }
}
