use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

// Decodes the `content` field of a contents response. GitHub wraps the
// base64 text at 60 columns; the line breaks are dropped before decoding.
// Non UTF-8 bytes are replaced, matching how local files are read.
pub fn decode_content(encoded: &str) -> Result<String, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64_STANDARD.decode(compact.as_bytes())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_payload() {
        let encoded = BASE64_STANDARD.encode("fn main() {\n    println!(\"hi\");\n}\n");
        let (a, b) = encoded.split_at(20);
        let wrapped = format!("{}\n{}\n", a, b);
        assert_eq!(decode_content(&wrapped).unwrap(), "fn main() {\n    println!(\"hi\");\n}\n");
    }

    #[test]
    fn utf8_survives() {
        let encoded = BASE64_STANDARD.encode("привет");
        assert_eq!(decode_content(&encoded).unwrap(), "привет");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(decode_content("@@not base64@@").is_err());
    }
}
