//! Enums for antakshari

use serde::{Deserialize, Serialize};

/// Catalog languages.
///
/// Declaration order is alphabetical so the derived `Ord` matches the
/// order free rounds are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    Bengali,
    English,
    Hindi,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Bengali, Language::English, Language::Hindi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Bengali => "Bengali",
            Language::English => "English",
            Language::Hindi => "Hindi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bengali" => Some(Language::Bengali),
            "english" => Some(Language::English),
            "hindi" => Some(Language::Hindi),
            _ => None,
        }
    }

    /// Leading letter of every short code in this language
    pub fn initial(&self) -> char {
        match self {
            Language::Bengali => 'B',
            Language::English => 'E',
            Language::Hindi => 'H',
        }
    }

    /// Language a short code belongs to, judged by its initial
    pub fn from_initial(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.initial() == c.to_ascii_uppercase())
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!(Language::from_str("hindi"), Some(Language::Hindi));
        assert_eq!(Language::from_str(" ENGLISH "), Some(Language::English));
        assert_eq!(Language::from_str("Tamil"), None);
    }

    #[test]
    fn test_initials_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_initial(lang.initial()), Some(lang));
        }
        assert_eq!(Language::from_initial('b'), Some(Language::Bengali));
        assert_eq!(Language::from_initial('X'), None);
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&Language::Bengali).unwrap();
        assert_eq!(json, "\"Bengali\"");
    }
}
