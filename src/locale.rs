//! The two supported locales and locale-indexed text lookup.
//!
//! Every user-visible string carries an English value and an optional
//! Cantonese (`zh-HK`) value; the rule everywhere is "fall back to English
//! when the Cantonese variant is absent".

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
  #[serde(rename = "en")]
  En,
  #[default]
  #[serde(rename = "zh-HK")]
  ZhHk,
}

impl Locale {
  pub fn as_str(&self) -> &'static str {
    match self {
      Locale::En => "en",
      Locale::ZhHk => "zh-HK",
    }
  }
}

impl std::fmt::Display for Locale {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Owned locale-indexed text, used for configurable prompt templates.
#[derive(Clone, Debug, Deserialize)]
pub struct LocaleText {
  pub en: String,
  #[serde(default)]
  pub zh_hk: Option<String>,
}

impl LocaleText {
  pub fn new(en: impl Into<String>, zh_hk: impl Into<String>) -> Self {
    Self { en: en.into(), zh_hk: Some(zh_hk.into()) }
  }

  pub fn get(&self, locale: Locale) -> &str {
    match locale {
      Locale::En => &self.en,
      Locale::ZhHk => self.zh_hk.as_deref().unwrap_or(&self.en),
    }
  }
}

/// Borrowed locale-indexed lookup over a pair of document fields.
/// Scenario documents store `field` + optional `field_zh`; this keeps the
/// fallback rule in one place instead of per-field conditionals.
#[derive(Clone, Copy, Debug)]
pub struct Localized<'a> {
  pub en: &'a str,
  pub zh_hk: Option<&'a str>,
}

impl<'a> Localized<'a> {
  pub fn get(&self, locale: Locale) -> &'a str {
    match locale {
      Locale::En => self.en,
      Locale::ZhHk => self.zh_hk.unwrap_or(self.en),
    }
  }
}
