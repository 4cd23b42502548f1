#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    raw: String,
    patterns: Vec<String>,
}

impl ExtensionFilter {
    pub fn parse(raw: &str) -> Self {
        let patterns = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: raw.to_string(),
            patterns,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|p| path.ends_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_list() {
        let f = ExtensionFilter::parse(".py,.js");
        assert!(f.matches("src/app.js"));
        assert!(f.matches("tool.py"));
        assert!(!f.matches("README.md"));
    }

    #[test]
    fn empty_admits_everything() {
        assert!(ExtensionFilter::parse("").matches("anything.bin"));
        assert!(ExtensionFilter::parse(" , ").matches("anything.bin"));
    }

    #[test]
    fn patterns_are_trimmed_but_not_case_folded() {
        let f = ExtensionFilter::parse(" .rs ,  .toml");
        assert!(f.matches("Cargo.toml"));
        assert!(f.matches("src/lib.rs"));
        assert!(!f.matches("src/LIB.RS"));
    }
}
