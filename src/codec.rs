use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Transport encoding for values placed on the worker command line.
///
/// Workers must apply the inverse transform to `--cmd`, `--data` and `--pipe`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum ArgEncoding {
    /// URL-safe base64 without padding. Output never starts with `-` and contains no
    /// whitespace or shell metacharacters.
    #[default]
    Base64Url,
    /// Values are passed through unchanged.
    Plain,
}

impl ArgEncoding {
    pub fn encode(&self, value: &str) -> String {
        match self {
            ArgEncoding::Base64Url => URL_SAFE_NO_PAD.encode(value.as_bytes()),
            ArgEncoding::Plain => value.to_string(),
        }
    }
}

/// Serialize a payload for `--data` / `--pipe`, or `None` when it carries nothing.
///
/// `null`, `""`, `[]` and `{}` count as empty and are not passed to the worker.
pub(crate) fn serialize_payload(value: Option<&serde_json::Value>) -> Option<String> {
    let value = value?;
    let empty = match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => false,
    };
    if empty {
        return None;
    }
    Some(value.to_string())
}
