//! Language definitions

use serde::{Deserialize, Serialize};

/// Languages the runtime speaks and listens in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Hindi,
    English,
}

impl Language {
    /// Locale code used in flow documents and collaborator requests
    pub fn code(&self) -> &'static str {
        match self {
            Language::Hindi => "hi",
            Language::English => "en",
        }
    }

    /// Parse from a locale code; unknown codes fall back to Hindi
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_lowercase().as_str() {
            "en" | "en-in" | "en-us" => Language::English,
            _ => Language::Hindi,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        assert_eq!(Language::from_code("hi"), Language::Hindi);
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code("en-IN"), Language::English);
        assert_eq!(Language::Hindi.code(), "hi");
    }

    #[test]
    fn test_unknown_falls_back_to_hindi() {
        assert_eq!(Language::from_code("ta"), Language::Hindi);
    }
}
