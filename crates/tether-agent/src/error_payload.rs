use std::collections::BTreeMap;

pub const PREFIX: &str = "TETHER_ERROR_JSON:";

const MAX_MESSAGE_BYTES: usize = 32 * 1024;
const MAX_HINT_BYTES: usize = 8 * 1024;
const MAX_FIELD_ERROR_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let suffix = "…(truncated)";
    let keep = max_bytes.saturating_sub(suffix.len()).max(1);
    let mut end = keep.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    let mut out = s[..end].to_string();
    out.push_str(suffix);
    out
}

fn to_line(payload: &ErrorPayload) -> String {
    let json = serde_json::to_string(payload)
        .unwrap_or_else(|_| "{\"code\":\"internal\",\"message\":\"serialize_failed\"}".to_string());
    format!("{PREFIX}{json}")
}

pub fn encode(
    code: &str,
    message: impl Into<String>,
    field_errors: Option<BTreeMap<String, String>>,
    hint: Option<String>,
) -> String {
    let message = truncate_utf8(&message.into(), MAX_MESSAGE_BYTES);

    let field_errors = field_errors.map(|mut m| {
        for v in m.values_mut() {
            *v = truncate_utf8(v, MAX_FIELD_ERROR_BYTES);
        }
        m
    });

    let hint = hint.map(|h| truncate_utf8(&h, MAX_HINT_BYTES));

    to_line(&ErrorPayload {
        code: code.to_string(),
        message,
        field_errors,
        hint,
        request_id: None,
    })
}

pub fn anyhow(
    code: &str,
    message: impl Into<String>,
    field_errors: Option<BTreeMap<String, String>>,
    hint: Option<String>,
) -> anyhow::Error {
    anyhow::anyhow!(encode(code, message, field_errors, hint))
}

pub(crate) fn format_error_chain(err: &anyhow::Error) -> String {
    let mut parts = Vec::<String>::new();
    for cause in err.chain() {
        let s = cause.to_string();
        if s.is_empty() {
            continue;
        }
        if parts.last() == Some(&s) {
            continue;
        }
        parts.push(s);
    }
    parts.join(": ")
}

fn hint_for(err: &tether_control::Error) -> Option<String> {
    use tether_control::Error;
    let hint = match err {
        Error::NotConnected | Error::Channel(_) => "check TETHER_SSH_* settings and that the host is reachable",
        Error::MissingCredential => "set TETHER_SUDO_PASSWORD",
        Error::InvalidTemplate(_) | Error::InvalidPattern(_) => "check the TETHER_CMD_* and TETHER_*_PATTERN overrides",
        _ => return None,
    };
    Some(hint.to_string())
}

/// Renders any agent failure as one payload line.
///
/// Errors that already carry a payload (see [`anyhow`]) keep it; everything
/// else is coded from the first [`tether_control::Error`] in its chain.
pub fn from_error(err: &anyhow::Error, request_id: &str) -> String {
    for cause in err.chain() {
        let text = cause.to_string();
        if let Some(json) = text.strip_prefix(PREFIX) {
            if let Ok(serde_json::Value::Object(mut payload)) = serde_json::from_str(json) {
                payload.insert("request_id".to_string(), request_id.into());
                return format!("{PREFIX}{}", serde_json::Value::Object(payload));
            }
        }
    }

    let control = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<tether_control::Error>());
    let code = control.map(tether_control::Error::code).unwrap_or("internal");
    let hint = control.and_then(hint_for);

    to_line(&ErrorPayload {
        code: code.to_string(),
        message: truncate_utf8(&format_error_chain(err), MAX_MESSAGE_BYTES),
        field_errors: None,
        hint: hint.map(|h| truncate_utf8(&h, MAX_HINT_BYTES)),
        request_id: Some(request_id.to_string()),
    })
}
