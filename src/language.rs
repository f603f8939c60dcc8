use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// A `(source, target)` language-code pair, one partition of work.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([a-zA-Z]+)-([a-zA-Z]+)\.csv$").unwrap())
}

fn dirname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([a-zA-Z]+)-([a-zA-Z]+)$").unwrap())
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Parses `source-target.csv`. Anything else yields `None`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename_pattern()
            .captures(filename)
            .map(|caps| Self::new(&caps[1], &caps[2]))
    }

    /// Parses an output directory name such as `en-fr`.
    pub fn from_dirname(name: &str) -> Option<Self> {
        dirname_pattern()
            .captures(name)
            .map(|caps| Self::new(&caps[1], &caps[2]))
    }

    pub fn source_name(&self) -> &str {
        language_name(&self.source)
    }

    pub fn target_name(&self) -> &str {
        language_name(&self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// `(code, name)`. Two- and three-letter codes; the corpora are mostly
/// English paired with Ghanaian and other West African languages.
const LANGUAGES: &[(&str, &str)] = &[
    ("ak", "Akan"),
    ("aka", "Akan"),
    ("ar", "Arabic"),
    ("dag", "Dagbani"),
    ("de", "German"),
    ("ee", "Ewe"),
    ("ewe", "Ewe"),
    ("en", "English"),
    ("eng", "English"),
    ("es", "Spanish"),
    ("fat", "Fante"),
    ("ff", "Fulah"),
    ("fr", "French"),
    ("fra", "French"),
    ("gaa", "Ga"),
    ("gur", "Farefare"),
    ("gjn", "Gonja"),
    ("ha", "Hausa"),
    ("hau", "Hausa"),
    ("ig", "Igbo"),
    ("it", "Italian"),
    ("kus", "Kusaal"),
    ("ln", "Lingala"),
    ("nzi", "Nzema"),
    ("pt", "Portuguese"),
    ("sw", "Swahili"),
    ("swa", "Swahili"),
    ("tw", "Twi"),
    ("twi", "Twi"),
    ("wo", "Wolof"),
    ("yo", "Yoruba"),
    ("yor", "Yoruba"),
    ("zh", "Chinese"),
    ("zu", "Zulu"),
];

/// Human-readable name for a language code. Unknown codes are returned as-is.
pub fn language_name(code: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_filenames() {
        assert_eq!(
            LanguagePair::from_filename("en-fr.csv"),
            Some(LanguagePair::new("en", "fr"))
        );
        assert_eq!(
            LanguagePair::from_filename("EN-twi.csv"),
            Some(LanguagePair::new("EN", "twi"))
        );
    }

    #[test]
    fn rejects_invalid_filenames() {
        assert_eq!(LanguagePair::from_filename("invalid.csv"), None);
        assert_eq!(LanguagePair::from_filename("en-fr-de.csv"), None);
        assert_eq!(LanguagePair::from_filename("en_fr.csv"), None);
        assert_eq!(LanguagePair::from_filename("en-fr.txt"), None);
        assert_eq!(LanguagePair::from_filename("e1-fr.csv"), None);
    }

    #[test]
    fn displays_as_hyphenated_codes() {
        assert_eq!(LanguagePair::new("en", "ee").to_string(), "en-ee");
        assert_eq!(LanguagePair::from_dirname("en-ee").unwrap().target, "ee");
        assert!(LanguagePair::from_dirname("reports").is_none());
    }

    #[test]
    fn resolves_language_names() {
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("TW"), "Twi");
        assert_eq!(language_name("xx"), "xx");
    }
}
