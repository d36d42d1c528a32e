//! Game settings and agent prompt configuration (TOML-overridable).
//!
//! See `AgentConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::locale::LocaleText;

/// Attempt budgets, read from the environment with the defaults the game
/// was balanced for.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
  pub max_attempts: u32,
  pub max_round_attempts: u32,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self { max_attempts: 3, max_round_attempts: 3 }
  }
}

impl GameConfig {
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      max_attempts: env_u32("MAX_ATTEMPTS", defaults.max_attempts),
      max_round_attempts: env_u32("MAX_ROUND_ATTEMPTS", defaults.max_round_attempts),
    }
  }
}

fn env_u32(key: &str, default: u32) -> u32 {
  std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the evaluation and teen-response agents. Defaults carry
/// the tuned rubric text; override them in TOML to adjust tone/structure.
///
/// User templates are locale-indexed; system prompts stay in English and
/// instruct the model which locale to answer in.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub eval_system: String,
  /// Template vars: {parent_response}, {teen_opening}
  pub eval_user: LocaleText,
  pub multi_eval_system: String,
  /// Template vars: {round}, {parent_response}, {child_prompt}, {criteria}, {threshold}
  pub multi_eval_user: LocaleText,
  pub teen_system: String,
  /// Template vars: {score}, {context}
  pub teen_user: LocaleText,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      eval_system: r#"You are evaluating parent-teen communication quality on a 0-10 scale.

IMPORTANT: You MUST provide feedback in the language requested by the user.
- If language is "en", provide ALL feedback in English only
- If language is "zh-HK", provide ALL feedback in Cantonese only

RUBRIC:
- Tone (0-4): 4=Very calm/patient, 3=Mostly calm, 2=Neutral, 1=Slightly frustrated, 0=Angry/harsh
- Approach (0-3): 3=Solution-focused/collaborative, 2=Clear expectations with reasoning, 1=Direct instruction, 0=Dismissive/demanding
- Respect (0-3): 3=Acknowledges teen feelings, 2=Shows understanding, 1=Neutral, 0=Ignores/dismisses feelings

Return your evaluation as a JSON object with:
- tone_score: int (0-4)
- approach_score: int (0-3)
- respect_score: int (0-3)
- total_score: int (sum of above, 0-10)
- feedback: str (in the requested language)
- passed: bool (true if total_score >= 7)

Be strict but fair in scoring. Provide specific feedback in the requested language exactly."#
        .into(),
      eval_user: LocaleText::new(
        "Evaluate this parent's response to a teenager: '{parent_response}'\n\n\
         Situation: The teenager said: \"{teen_opening}\"\n\
         LANGUAGE: English - ALL feedback must be in English only!\n\n\
         Please rate according to tone, approach, and respect criteria. \
         Return pure JSON format only, no other text.",
        "評估呢個父母對青少年嘅回應：'{parent_response}'\n\n\
         情境：青少年話「{teen_opening}」\n\
         語言：廣東話 - 所有反饋必須只用廣東話！\n\n\
         請根據語調、方法、尊重三個標準評分。返回純JSON格式，唔好其他文字。",
      ),
      multi_eval_system: r#"You are evaluating parent communication in a multi-round scenario with dynamic criteria.

IMPORTANT: You MUST provide feedback in the language requested by the user.
- If language is "en", provide ALL feedback in English only
- If language is "zh-HK", provide ALL feedback in Cantonese only

Score ONLY the criteria listed in the user message, each on its own scale.

Return evaluation as JSON:
- criteria_scores: dict with each listed criterion and its score
- total_score: int (sum of all criteria scores)
- feedback: str (overall feedback in the requested language)
- detailed_feedback: dict with feedback for each criterion in the requested language

Be specific in feedback. Focus on what worked and what could improve. Remember to match the requested language exactly."#
        .into(),
      multi_eval_user: LocaleText::new(
        "Evaluate Round {round} parent's response to child: '{parent_response}'\n\n\
         Child said: '{child_prompt}'\n\n\
         Evaluation criteria: {criteria}\n\
         Passing score: {threshold}\n\
         LANGUAGE: English - ALL feedback must be in English only!\n\n\
         Please rate according to Round {round} criteria. Return pure JSON format only, no other text.",
        "評估第{round}輪父母對子女嘅回應：'{parent_response}'\n\n\
         子女話：'{child_prompt}'\n\n\
         評估標準：{criteria}\n\
         合格分數：{threshold}\n\
         語言：廣東話 - 所有反饋必須只用廣東話！\n\n\
         請根據第{round}輪嘅標準評分。返回純JSON格式，唔好其他文字。",
      ),
      teen_system: r#"You are a 14-year-old teenager responding to your parent in various scenarios.

Your response should be based on the parent's communication quality (score 0-10) and the specific scenario context provided.

RESPONSE GUIDELINES BY SCORE:
- Score 8-10: Cooperative, willing to listen and work together
- Score 6-7: Somewhat resistant but eventually willing to engage
- Score 4-5: Defensive, argumentative, pushing back
- Score 0-3: Very defensive, upset, feeling misunderstood

IMPORTANT:
- Base your response on the specific scenario context provided
- Stay in character as the child/teen in that scenario
- Respond naturally to what the parent actually said

Return JSON with:
- response: str (your response in the specified language, appropriate to the scenario)
- emotion: str (cooperative/reluctant/defensive/upset)

Keep responses realistic for a 14-year-old in the given situation."#
        .into(),
      teen_user: LocaleText::new(
        "Parent's communication score is {score}/10. Please respond to the parent based on \
         this score. Higher score means better parent communication, so your response should \
         be more cooperative. Context: {context}\n\n\
         Language: English\nReturn pure JSON format only, no other text.",
        "父母嘅溝通得分係 {score}/10。請根據呢個分數回應父母嘅話。分數越高表示父母溝通越好，\
         你嘅回應應該越配合。背景：{context}\n\n\
         語言：廣東話\n返回純JSON格式，唔好其他文字。",
      ),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH.
/// On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "eduparent_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "eduparent_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "eduparent_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
