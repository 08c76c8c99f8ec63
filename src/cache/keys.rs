use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

pub const QUERY_PREFIX: &str = "query:";
pub const CHAT_PREFIX: &str = "chat:";

/// Key for an analytics answer: `query:<sha256-hex>` of the trimmed,
/// lower-cased question.
pub fn query_key(question: &str) -> String {
    let normalized = question.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{}{:x}", QUERY_PREFIX, hasher.finalize())
}

/// Key for a chat answer: `chat:<base64(prompt[:context])>`.
///
/// The prompt is encoded verbatim with no hashing, so keys grow with the
/// prompt. Kept that way so existing chat entries stay addressable.
pub fn chat_key(prompt: &str, context: Option<&str>) -> String {
    let raw = match context {
        Some(context) => format!("{}:{}", prompt, context),
        None => prompt.to_string(),
    };
    format!("{}{}", CHAT_PREFIX, BASE64.encode(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(query_key("Total Orders"), query_key("  total orders  "));
        assert_eq!(query_key("Total Orders"), query_key("TOTAL ORDERS"));
    }

    #[test]
    fn query_key_is_prefixed_sha256_hex() {
        let key = query_key("select 1");
        let hex = key.strip_prefix("query:").unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(
            query_key(""),
            "query:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn query_key_is_deterministic() {
        let question = "Revenue by state in 2018";
        assert_eq!(query_key(question), query_key(question));
        assert_ne!(query_key(question), query_key("Revenue by state in 2017"));
    }

    #[test]
    fn chat_key_encodes_prompt_and_context() {
        assert_eq!(chat_key("hi", None), "chat:aGk=");
        assert_eq!(chat_key("q", Some("ctx")), format!("chat:{}", BASE64.encode("q:ctx")));
    }

    #[test]
    fn chat_key_depends_on_context() {
        assert_ne!(chat_key("q", Some("ctx1")), chat_key("q", Some("ctx2")));
        assert_ne!(chat_key("q", None), chat_key("q", Some("ctx1")));
        assert_eq!(chat_key("q", Some("ctx1")), chat_key("q", Some("ctx1")));
    }
}
