use serde::{Deserialize, Serialize};

/// One request line: a selector, the LaTeX payload, and a caller-chosen id
/// echoed back so responses can be matched up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    pub text: String,
    pub id: u64,
}

/// One response line. Failures come back with `command` set to `"error"`
/// and no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub res: String,
}

impl Response {
    pub fn success(command: impl Into<String>, id: u64, res: String) -> Self {
        Self {
            command: command.into(),
            id: Some(id),
            res,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            command: "error".into(),
            id: None,
            res: message.into(),
        }
    }
}
