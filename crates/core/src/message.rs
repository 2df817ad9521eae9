//! Turn and conversation identity types.
//!
//! A turn is the unit of conversation history:
//! user speaks → model replies or asks for a tool → tool answers → model replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a conversation.
///
/// Derived by the caller from the originating chat (channel id, DM id, ...).
/// The core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions plus per-call context; synthesized on read, never stored
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Output of a tool invocation
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDirective {
    /// Name of the tool to invoke
    pub name: String,

    /// Arguments exactly as the model produced them (a JSON string)
    pub arguments: String,
}

/// A single entry in a conversation's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    /// The text content (empty for tool-call turns)
    pub content: String,

    /// Set only on assistant turns that request a tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallDirective>,

    /// Set only on tool-result turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// When the turn was created
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_call: None,
            tool_name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant turn carrying a reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create an assistant turn recording a tool-call directive.
    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        let mut turn = Self::with_role(Role::Assistant, String::new());
        turn.tool_call = Some(ToolCallDirective {
            name: name.into(),
            arguments: arguments.into(),
        });
        turn
    }

    /// Create a tool-result turn.
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut turn = Self::with_role(Role::Tool, content.into());
        turn.tool_name = Some(tool_name.into());
        turn
    }

    /// Whether this is an assistant turn that requested a tool.
    pub fn is_tool_call(&self) -> bool {
        self.role == Role::Assistant && self.tool_call.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello, bot!");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello, bot!");
        assert!(turn.tool_call.is_none());
        assert!(turn.tool_name.is_none());
    }

    #[test]
    fn tool_call_turn_has_empty_content() {
        let turn = Turn::tool_call("echo", r#"{"text":"hi"}"#);
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.content.is_empty());
        assert!(turn.is_tool_call());
        let call = turn.tool_call.unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(call.arguments, r#"{"text":"hi"}"#);
    }

    #[test]
    fn tool_result_turn_records_name() {
        let turn = Turn::tool_result("echo", "hi");
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_name.as_deref(), Some("echo"));
        assert!(!turn.is_tool_call());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn turn_skips_absent_optionals() {
        let json = serde_json::to_string(&Turn::user("x")).unwrap();
        assert!(!json.contains("tool_call"));
        assert!(!json.contains("tool_name"));
    }

    #[test]
    fn conversation_id_conversions() {
        let a = ConversationId::from("1234");
        let b: ConversationId = String::from("1234").into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "1234");
        assert_eq!(a.as_str(), "1234");
    }
}
