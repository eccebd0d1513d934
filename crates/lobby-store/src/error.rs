use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status. Carries the structured
    /// error fields the store returns alongside the status.
    #[error("store rejected request ({status}): {code} - {message} (hint: {hint}) // {details}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
        hint: String,
        details: String,
    },

    /// The store answered 2xx but the payload did not match the row shape.
    #[error("store returned a malformed payload: {0}")]
    Malformed(#[source] reqwest::Error),
}

/// Error body shape used by the store's REST layer. All fields are optional
/// in practice, so each one is defaulted when missing.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    hint: Option<String>,
    details: Option<String>,
}

impl StoreError {
    pub(crate) fn rejected(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        StoreError::Rejected {
            status,
            code: parsed.code.unwrap_or_else(|| "unknown".into()),
            // A non-JSON body still ends up in the log, just unstructured.
            message: parsed.message.unwrap_or_else(|| body.trim().to_string()),
            hint: parsed.hint.unwrap_or_else(|| "none".into()),
            details: parsed.details.unwrap_or_else(|| "none".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_embeds_structured_fields() {
        let err = StoreError::rejected(
            409,
            r#"{"code":"23503","message":"violates foreign key","hint":"check reply_to","details":"Key (reply_to)=(99) is not present"}"#,
        );
        let text = err.to_string();
        assert!(text.contains("409"));
        assert!(text.contains("23503"));
        assert!(text.contains("violates foreign key"));
        assert!(text.contains("check reply_to"));
        assert!(text.contains("Key (reply_to)=(99) is not present"));
    }

    #[test]
    fn rejected_keeps_unparseable_body_as_message() {
        let err = StoreError::rejected(502, "upstream unavailable\n");
        let text = err.to_string();
        assert!(text.contains("502"));
        assert!(text.contains("unknown"));
        assert!(text.contains("upstream unavailable"));
    }
}
