//! Kakao skill wire types.
//!
//! Inbound events are parsed best-effort: a malformed event degrades to
//! empty fields instead of an error, and the webhook still acknowledges.
//! Outbound payloads are the fixed skill-response shapes the platform
//! expects.

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Inbound Event
// ============================================================================

/// Fields extracted from an inbound skill webhook body.
#[derive(Debug, Clone)]
pub struct SkillEvent {
    /// What the user typed
    pub utterance: String,
    /// Where to deliver the final answer
    pub callback_url: Option<String>,
    /// Stable platform identifier of the end user
    pub user_id: Option<String>,
}

impl SkillEvent {
    /// Best-effort extraction from the raw webhook body.
    ///
    /// The user-request object normally sits under `userRequest`; older
    /// builder exports emit `user Request` (with a space), so both keys are
    /// accepted. Absent or empty fields become `None`.
    pub fn from_value(body: &Value) -> Self {
        let user_request = body
            .get("userRequest")
            .or_else(|| body.get("user Request"));

        let field = |name: &str| -> Option<String> {
            user_request?
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let user_id = user_request
            .and_then(|r| r.get("user"))
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            utterance: field("utterance").unwrap_or_default(),
            callback_url: field("callbackUrl"),
            user_id,
        }
    }
}

// ============================================================================
// Outbound Payloads
// ============================================================================

/// Immediate acknowledgement returned while the answer is generated.
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    version: &'static str,
    #[serde(rename = "useCallback")]
    use_callback: bool,
    data: AckData,
}

#[derive(Debug, Clone, Serialize)]
struct AckData {
    text: String,
}

/// Build the "processing" acknowledgement.
pub fn ack(text: impl Into<String>) -> AckResponse {
    AckResponse {
        version: "2.0",
        use_callback: true,
        data: AckData { text: text.into() },
    }
}

/// Final skill response POSTed to the callback URL.
#[derive(Debug, Clone, Serialize)]
pub struct SkillResponse {
    version: &'static str,
    template: Template,
}

#[derive(Debug, Clone, Serialize)]
struct Template {
    outputs: Vec<Output>,
}

#[derive(Debug, Clone, Serialize)]
struct Output {
    #[serde(rename = "simpleText")]
    simple_text: SimpleText,
}

#[derive(Debug, Clone, Serialize)]
struct SimpleText {
    text: String,
}

/// Build a single simpleText skill response.
pub fn simple_text(text: impl Into<String>) -> SkillResponse {
    SkillResponse {
        version: "2.0",
        template: Template {
            outputs: vec![Output {
                simple_text: SimpleText { text: text.into() },
            }],
        },
    }
}
