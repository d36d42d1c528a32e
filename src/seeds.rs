//! Built-in scenarios that keep the game playable when no scenario
//! directory is configured.

use std::collections::HashMap;

use crate::model::Criterion;
use crate::scenarios::{RoundSpec, Scenario};

pub fn seed_scenarios() -> HashMap<String, Scenario> {
  let mut map = HashMap::new();
  map.insert("school_dropoff_anxiety".to_string(), school_dropoff_anxiety());
  map.insert("messy_room".to_string(), messy_room());
  map
}

fn school_dropoff_anxiety() -> Scenario {
  Scenario {
    case_name: "School Drop-off Anxiety".into(),
    case_name_zh: Some("上學前分離焦慮".into()),
    background_and_instructions: "Your 6-year-old clings to you at the school gate every \
      morning. Today the resistance is stronger than usual. Respond the way you would at \
      the gate; the child reacts to how you communicate."
      .into(),
    background_and_instructions_zh: Some(
      "你嘅六歲小朋友每朝喺校門口都攬住你唔放，今日抗拒得特別厲害。請好似真係喺校門口咁回應，小朋友會根據你嘅溝通方式作出反應。".into(),
    ),
    child_prompts: vec![],
    multi_round: true,
    rounds: vec![
      RoundSpec {
        round: 1,
        child_state: "initial_resistance".into(),
        child_prompt: "I don't want to go to school today! I want to stay home with you!".into(),
        child_prompt_zh: Some("我今日唔想返學！我想留喺屋企陪你！".into()),
        evaluation_criteria: vec![
          Criterion::EmotionAcknowledgment,
          Criterion::ToneEmpathy,
          Criterion::SolutionApproach,
        ],
        pass_threshold: 6,
      },
      RoundSpec {
        round: 2,
        child_state: "deeper_fear_expression".into(),
        child_prompt: "What if you forget to pick me up? What if something happens to you \
          while I'm at school?"
          .into(),
        child_prompt_zh: Some("如果你唔記得嚟接我點算？如果我返學嗰陣你出咗事點算？".into()),
        evaluation_criteria: vec![
          Criterion::FearValidation,
          Criterion::ConcreteReassurance,
          Criterion::CollaborativeApproach,
        ],
        pass_threshold: 7,
      },
      RoundSpec {
        round: 3,
        child_state: "transition_challenge".into(),
        child_prompt: "Okay... but can you stay with me until the bell rings?".into(),
        child_prompt_zh: Some("好啦……但係你可唔可以陪我等到打鐘？".into()),
        evaluation_criteria: vec![
          Criterion::TransitionStrategy,
          Criterion::ChildAgency,
          Criterion::FollowThroughClarity,
        ],
        pass_threshold: 7,
      },
    ],
  }
}

fn messy_room() -> Scenario {
  Scenario {
    case_name: "Messy Room".into(),
    case_name_zh: Some("房間一團糟".into()),
    background_and_instructions: "Your 14-year-old's room has been a mess for weeks and \
      you have asked twice already. You walk in while they are on their phone."
      .into(),
    background_and_instructions_zh: Some(
      "你十四歲嘅仔女間房已經亂咗幾個禮拜，你已經講過兩次。你行入房嗰陣佢正喺度玩電話。".into(),
    ),
    child_prompts: vec![
      "I'll clean it later, stop nagging me!".into(),
      "我遲啲先執啦，唔好再煩我！".into(),
    ],
    multi_round: false,
    rounds: vec![],
  }
}
