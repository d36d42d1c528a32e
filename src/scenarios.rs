//! Scenario documents and the store that loads them.
//!
//! One TOML document per scenario under `SCENARIOS_DIR`, plus the built-in
//! seed scenarios so the server is playable with no directory configured.
//! Malformed documents are logged and treated as "not found"; they never
//! crash a request.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::locale::{Locale, Localized};
use crate::model::Criterion;
use crate::seeds::seed_scenarios;

fn default_pass_threshold() -> i32 {
  7
}

/// One round of a multi-round scenario: the child's emotional state and
/// prompt, plus the rubric that round is scored against.
#[derive(Clone, Debug, Deserialize)]
pub struct RoundSpec {
  pub round: u32,
  pub child_state: String,
  pub child_prompt: String,
  #[serde(default)]
  pub child_prompt_zh: Option<String>,
  pub evaluation_criteria: Vec<Criterion>,
  #[serde(default = "default_pass_threshold")]
  pub pass_threshold: i32,
}

impl RoundSpec {
  pub fn prompt(&self, locale: Locale) -> &str {
    Localized { en: &self.child_prompt, zh_hk: self.child_prompt_zh.as_deref() }.get(locale)
  }
}

/// A roleplay scenario definition. Immutable once loaded.
#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
  pub case_name: String,
  #[serde(default)]
  pub case_name_zh: Option<String>,
  pub background_and_instructions: String,
  #[serde(default)]
  pub background_and_instructions_zh: Option<String>,
  /// Legacy single-round opening lines: English first, Cantonese second.
  #[serde(default)]
  pub child_prompts: Vec<String>,
  #[serde(default)]
  pub multi_round: bool,
  #[serde(default)]
  pub rounds: Vec<RoundSpec>,
}

impl Scenario {
  pub fn title(&self, locale: Locale) -> &str {
    Localized { en: &self.case_name, zh_hk: self.case_name_zh.as_deref() }.get(locale)
  }

  pub fn background(&self, locale: Locale) -> &str {
    Localized {
      en: &self.background_and_instructions,
      zh_hk: self.background_and_instructions_zh.as_deref(),
    }
    .get(locale)
  }

  pub fn is_multi_round(&self) -> bool {
    self.multi_round && !self.rounds.is_empty()
  }

  pub fn max_rounds(&self) -> u32 {
    if self.is_multi_round() { self.rounds.len() as u32 } else { 1 }
  }

  /// Round data by 1-based round number.
  pub fn round_spec(&self, round_number: u32) -> Option<&RoundSpec> {
    if !self.is_multi_round() || round_number == 0 {
      return None;
    }
    self.rounds.get(round_number as usize - 1)
  }

  /// The teen's opening line: first round prompt for multi-round
  /// scenarios, otherwise the locale-appropriate legacy prompt.
  pub fn teen_opening(&self, locale: Locale) -> &str {
    if let Some(first) = self.rounds.first().filter(|_| self.is_multi_round()) {
      return first.prompt(locale);
    }
    match locale {
      Locale::ZhHk if self.child_prompts.len() > 1 => &self.child_prompts[1],
      _ => self.child_prompts.first().map(String::as_str).unwrap_or(""),
    }
  }

  /// Round numbers must be contiguous starting at 1.
  fn validate(&self) -> Result<(), String> {
    for (i, r) in self.rounds.iter().enumerate() {
      let expected = i as u32 + 1;
      if r.round != expected {
        return Err(format!("round {} out of order (expected {})", r.round, expected));
      }
    }
    Ok(())
  }
}

/// Loads scenarios from disk with built-in seeds as a safety net.
pub struct ScenarioStore {
  dir: Option<PathBuf>,
  builtin: HashMap<String, Scenario>,
}

impl ScenarioStore {
  pub fn new(dir: Option<PathBuf>) -> Self {
    Self { dir, builtin: seed_scenarios() }
  }

  /// Build from SCENARIOS_DIR if set, otherwise seeds only.
  pub fn from_env() -> Self {
    let dir = std::env::var("SCENARIOS_DIR").ok().map(PathBuf::from);
    if let Some(d) = &dir {
      info!(target: "roleplay", dir = %d.display(), "Scenario directory configured");
    } else {
      info!(target: "roleplay", "No SCENARIOS_DIR; serving built-in scenarios only");
    }
    Self::new(dir)
  }

  /// Load a scenario by name. Disk documents win over seeds; a malformed
  /// document is logged and reported as not found.
  #[instrument(level = "debug", skip(self))]
  pub fn load(&self, name: &str) -> Option<Scenario> {
    if let Some(dir) = &self.dir {
      let path = dir.join(format!("{name}.toml"));
      if path.exists() {
        return match std::fs::read_to_string(&path) {
          Ok(text) => match toml::from_str::<Scenario>(&text) {
            Ok(scenario) => match scenario.validate() {
              Ok(()) => Some(scenario),
              Err(e) => {
                error!(target: "roleplay", %name, error = %e, "Invalid scenario document");
                None
              }
            },
            Err(e) => {
              error!(target: "roleplay", %name, error = %e, "Failed to parse scenario TOML");
              None
            }
          },
          Err(e) => {
            error!(target: "roleplay", %name, error = %e, "Failed to read scenario file");
            None
          }
        };
      }
    }
    self.builtin.get(name).cloned()
  }

  /// Sorted names of every available scenario (disk and built-in).
  pub fn list(&self) -> Vec<String> {
    let mut names: Vec<String> = self.builtin.keys().cloned().collect();
    if let Some(dir) = &self.dir {
      if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
          let path = entry.path();
          if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
              names.push(stem.to_string());
            }
          }
        }
      }
    }
    names.sort();
    names.dedup();
    names
  }

  /// First available scenario in list order.
  pub fn default_scenario(&self) -> Option<Scenario> {
    self.list().first().and_then(|name| self.load(name))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DOC: &str = r#"
case_name = "School Drop-off Anxiety"
case_name_zh = "上學前分離焦慮"
background_and_instructions = "Your child resists the morning drop-off."
multi_round = true

[[rounds]]
round = 1
child_state = "initial_resistance"
child_prompt = "I don't want to go!"
child_prompt_zh = "我唔想去！"
evaluation_criteria = ["emotion_acknowledgment", "tone_empathy", "solution_approach"]
pass_threshold = 6

[[rounds]]
round = 2
child_state = "deeper_fear_expression"
child_prompt = "What if you forget me?"
evaluation_criteria = ["fear_validation", "concrete_reassurance", "collaborative_approach"]
"#;

  #[test]
  fn parses_multi_round_document() {
    let s: Scenario = toml::from_str(DOC).unwrap();
    assert!(s.is_multi_round());
    assert_eq!(s.max_rounds(), 2);
    assert_eq!(s.round_spec(1).unwrap().pass_threshold, 6);
    // default threshold
    assert_eq!(s.round_spec(2).unwrap().pass_threshold, 7);
    assert_eq!(
      s.round_spec(2).unwrap().evaluation_criteria[0],
      Criterion::FearValidation
    );
    assert!(s.round_spec(0).is_none());
    assert!(s.round_spec(3).is_none());
  }

  #[test]
  fn locale_fallback_on_fields() {
    let s: Scenario = toml::from_str(DOC).unwrap();
    assert_eq!(s.title(Locale::ZhHk), "上學前分離焦慮");
    // background has no Cantonese variant
    assert_eq!(s.background(Locale::ZhHk), s.background(Locale::En));
    assert_eq!(s.teen_opening(Locale::ZhHk), "我唔想去！");
    // round 2 prompt falls back to English
    assert_eq!(s.round_spec(2).unwrap().prompt(Locale::ZhHk), "What if you forget me?");
  }

  #[test]
  fn rejects_non_contiguous_rounds() {
    let doc = DOC.replace("round = 2", "round = 5");
    let s: Scenario = toml::from_str(&doc).unwrap();
    assert!(s.validate().is_err());
  }

  #[test]
  fn store_serves_seeds_without_dir() {
    let store = ScenarioStore::new(None);
    let names = store.list();
    assert_eq!(names, vec!["messy_room", "school_dropoff_anxiety"]);
    assert!(store.load("school_dropoff_anxiety").is_some());
    assert!(store.load("does_not_exist").is_none());
    // default is the first in list order
    let default = store.default_scenario().unwrap();
    assert_eq!(default.case_name, "Messy Room");
  }

  #[test]
  fn repeated_loads_are_idempotent() {
    let store = ScenarioStore::new(None);
    let a = store.load("messy_room").unwrap();
    let b = store.load("messy_room").unwrap();
    assert_eq!(a.case_name, b.case_name);
    assert_eq!(a.child_prompts, b.child_prompts);
  }
}
