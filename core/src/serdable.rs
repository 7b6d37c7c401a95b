use std::{fmt, ops::Deref};

use glob::{Pattern, PatternError};
use serde::{Deserialize, Serialize};

/// Exclude pattern of `[cases]`, kept in config files as its source string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlobPattern(Pattern);

impl GlobPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        Pattern::new(pattern).map(Self)
    }
}

impl Deref for GlobPattern {
    type Target = Pattern;

    fn deref(&self) -> &Pattern {
        &self.0
    }
}

impl TryFrom<String> for GlobPattern {
    type Error = PatternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<GlobPattern> for String {
    fn from(pat: GlobPattern) -> Self {
        pat.0.as_str().to_owned()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exclude_list_from_toml() {
        #[derive(Deserialize)]
        struct X {
            exclude: Vec<GlobPattern>,
        }
        let x: X = toml::from_str(r#"exclude = [".DS_Store", "*.swp"]"#).unwrap();
        assert!(x.exclude[0].matches(".DS_Store"));
        assert!(!x.exclude[0].matches("1.txt"));
        assert!(x.exclude[1].matches(".1.txt.swp"));
    }

    #[test]
    fn serialized_as_source_string() {
        let pat = GlobPattern::parse("*.[io]").unwrap();
        assert_eq!(serde_json::to_string(&pat).unwrap(), r#""*.[io]""#);
        assert_eq!(pat.to_string(), "*.[io]");
    }

    #[test]
    fn broken_pattern_is_rejected() {
        let res: Result<GlobPattern, _> = serde_json::from_str(r#""[a""#);
        assert!(res.is_err());
    }
}
