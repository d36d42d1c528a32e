//! Teen-response agent: generates an in-character reply calibrated to the
//! evaluation score, with locale-specific stock phrases as the fallback.

use std::sync::Arc;

use tracing::{error, instrument};

use crate::config::Prompts;
use crate::locale::Locale;
use crate::model::TeenReply;
use crate::openai::LlmClient;
use crate::util::{fill_template, strip_code_fences};

pub struct TeenResponder {
  client: Option<Arc<dyn LlmClient>>,
  model: String,
}

impl TeenResponder {
  pub fn new(client: Option<Arc<dyn LlmClient>>, model: String) -> Self {
    Self { client, model }
  }

  /// Higher score, more cooperative reply. `context` is free-text scenario
  /// background the model stays in character with.
  #[instrument(level = "info", skip(self, prompts, context), fields(%locale, score))]
  pub async fn respond(
    &self,
    prompts: &Prompts,
    score: i32,
    context: &str,
    locale: Locale,
  ) -> TeenReply {
    let score_s = score.to_string();
    let user = fill_template(
      prompts.teen_user.get(locale),
      &[("score", &score_s), ("context", context)],
    );

    let parsed = match &self.client {
      Some(client) => match client.chat_json(&self.model, &prompts.teen_system, &user, 0.8).await {
        Ok(raw) => serde_json::from_str::<TeenReply>(strip_code_fences(&raw))
          .map_err(|e| format!("JSON parse error: {}", e)),
        Err(e) => Err(e),
      },
      None => Err("model unavailable (no OPENAI_API_KEY)".into()),
    };

    match parsed {
      Ok(reply) => reply,
      Err(e) => {
        error!(target: "roleplay", error = %e, "Teen response failed; using fallback");
        fallback_reply(score, locale)
      }
    }
  }
}

/// Stock phrase keyed on whether the parent's score cleared 7.
fn fallback_reply(score: i32, locale: Locale) -> TeenReply {
  match (locale, score >= 7) {
    (Locale::En, true) => TeenReply {
      response: "Okay, I understand what you're saying".into(),
      emotion: "cooperative".into(),
    },
    (Locale::En, false) => TeenReply {
      response: "I don't want to talk about this right now".into(),
      emotion: "defensive".into(),
    },
    (Locale::ZhHk, true) => TeenReply {
      response: "好啦，我明白你嘅意思".into(),
      emotion: "cooperative".into(),
    },
    (Locale::ZhHk, false) => TeenReply {
      response: "我而家唔想講呢啲".into(),
      emotion: "defensive".into(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;

  struct StaticLlm(&'static str);

  #[async_trait]
  impl LlmClient for StaticLlm {
    async fn chat_json(&self, _m: &str, _s: &str, _u: &str, _t: f32) -> Result<String, String> {
      Ok(self.0.to_string())
    }
  }

  #[tokio::test]
  async fn fallback_splits_on_score_seven() {
    let responder = TeenResponder::new(None, "gpt-4o-mini".into());
    let good = responder.respond(&Prompts::default(), 8, "", Locale::En).await;
    assert_eq!(good.emotion, "cooperative");
    let bad = responder.respond(&Prompts::default(), 6, "", Locale::En).await;
    assert_eq!(bad.emotion, "defensive");

    let zh = responder.respond(&Prompts::default(), 8, "", Locale::ZhHk).await;
    assert_eq!(zh.response, "好啦，我明白你嘅意思");
  }

  #[tokio::test]
  async fn missing_emotion_defaults_to_neutral() {
    let responder = TeenResponder::new(
      Some(Arc::new(StaticLlm("{\"response\":\"fine, I'll go\"}"))),
      "gpt-4o-mini".into(),
    );
    let reply = responder.respond(&Prompts::default(), 9, "school gate", Locale::En).await;
    assert_eq!(reply.response, "fine, I'll go");
    assert_eq!(reply.emotion, "neutral");
  }

  #[tokio::test]
  async fn fenced_reply_is_parsed() {
    let responder = TeenResponder::new(
      Some(Arc::new(StaticLlm("```json\n{\"response\":\"ok\",\"emotion\":\"cooperative\"}\n```"))),
      "gpt-4o-mini".into(),
    );
    let reply = responder.respond(&Prompts::default(), 9, "", Locale::En).await;
    assert_eq!(reply.emotion, "cooperative");
  }
}
