use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Subject-matter persona the tutor adopts for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Persona {
    #[default]
    #[serde(rename = "default")]
    General,
    #[serde(rename = "math")]
    Mathematics,
    #[serde(rename = "science")]
    Science,
    #[serde(rename = "english")]
    LanguageArts,
    #[serde(rename = "english_grammar")]
    EnglishGrammar,
    #[serde(rename = "bangla_grammar")]
    BanglaGrammar,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::General,
        Persona::Mathematics,
        Persona::Science,
        Persona::LanguageArts,
        Persona::EnglishGrammar,
        Persona::BanglaGrammar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::General => "default",
            Persona::Mathematics => "math",
            Persona::Science => "science",
            Persona::LanguageArts => "english",
            Persona::EnglishGrammar => "english_grammar",
            Persona::BanglaGrammar => "bangla_grammar",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Persona::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| AppError::ValidationError(format!("Unknown tutor persona '{}'", s)))
    }
}

/// Target language for everything the tutor produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Bn,
    Zh,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Bn => "bn",
            Locale::Zh => "zh",
        }
    }

    /// Human-readable language name used inside model instructions.
    pub fn language_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Bn => "Bengali (Bangla)",
            Locale::Zh => "Chinese (Mandarin)",
        }
    }

    /// Output language implied by the country a student studies in.
    pub fn for_country(country: &str) -> Self {
        match country.trim().to_lowercase().as_str() {
            "bangladesh" => Locale::Bn,
            "china" => Locale::Zh,
            _ => Locale::En,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "bn" => Ok(Locale::Bn),
            "zh" => Ok(Locale::Zh),
            other => Err(AppError::ValidationError(format!(
                "Unsupported locale '{}'",
                other
            ))),
        }
    }
}
