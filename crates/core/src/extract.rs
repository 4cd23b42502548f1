use once_cell::sync::Lazy;
use regex::Regex;

// Opening fence (with optional info string) up to the newline, then the body
// up to a newline followed by the closing fence.
static FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n]*\n(.*?)\n```").expect("fenced block pattern"));

pub fn extract_code(response: &str) -> String {
    let mut code = String::new();
    for caps in FENCED.captures_iter(response) {
        if let Some(body) = caps.get(1) {
            code.push_str(body.as_str());
            code.push('\n');
        }
    }
    code.trim().to_string()
}

// A response as shown to the user. Extraction is redone on every
// construction, including history replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presented {
    pub raw: String,
    pub code: String,
}

impl Presented {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let code = extract_code(&raw);
        Self { raw, code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_blocks_join_with_newline() {
        let resp = "Here:\n```\na\n```\nand\n```rust\nb\n```\n";
        assert_eq!(extract_code(resp), "a\nb");
    }

    #[test]
    fn no_blocks_is_empty() {
        assert_eq!(extract_code("just prose, no code"), "");
        assert_eq!(extract_code(""), "");
    }

    #[test]
    fn multiline_bodies_are_kept() {
        let resp = "```python\ndef f():\n    return 1\n```";
        assert_eq!(extract_code(resp), "def f():\n    return 1");
    }

    #[test]
    fn unterminated_block_is_ignored() {
        assert_eq!(extract_code("```\nnever closed"), "");
    }

    #[test]
    fn presented_extracts_on_construction() {
        let p = Presented::new("```\nx = 1\n```");
        assert_eq!(p.code, "x = 1");
        assert_eq!(p.raw, "```\nx = 1\n```");
    }
}
