//! Provider-agnostic LLM invocation interface.
//!
//! This crate defines the wire-shape types the StoryForge engine consumes:
//! requests carrying a conversation plus tool schemas, and replies carrying
//! free text plus zero or more structured tool invocations. The concrete
//! transport (HTTP client, provider protocol, streaming) lives outside this
//! workspace; providers plug in by implementing [`ModelClient`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a model client implementation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of conversation history sent with a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A tool definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// How the model is allowed to pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
    /// The model must call some tool.
    Required,
    /// Tools are disabled for this request.
    None,
}

/// A structured tool invocation returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned call id (or a synthetic one for fallback-extracted
    /// calls).
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Create a request with the given conversation history.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            model: None,
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the tools available to the model.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the tool choice policy.
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    /// Override the model for this request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the maximum number of output tokens.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A completion reply.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    /// Free text, with any reasoning block already split out.
    pub text: String,
    /// Chain-of-thought text, when the provider surfaces it separately.
    pub reasoning: Option<String>,
    /// Natively-structured tool invocations, possibly empty.
    pub tool_calls: Vec<ToolInvocation>,
}

impl ModelReply {
    /// Create a text-only reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reasoning: None,
            tool_calls: Vec::new(),
        }
    }

    /// Create a reply carrying one native tool invocation.
    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        let name = name.into();
        Self {
            text: String::new(),
            reasoning: None,
            tool_calls: vec![ToolInvocation {
                id: format!("call_{name}"),
                name,
                args,
            }],
        }
    }

    /// Whether the reply contains any native tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A model provider.
///
/// Implementations own the transport; the engine only sees requests and
/// replies. `send` takes `&mut self` so scripted test clients can advance
/// internal state.
pub trait ModelClient {
    fn send(
        &mut self,
        request: ModelRequest,
    ) -> impl std::future::Future<Output = Result<ModelReply, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builder_sets_fields() {
        let req = ModelRequest::new(vec![Message::user("write chapter 1")])
            .with_system("you are a novelist")
            .with_max_tokens(2048)
            .with_temperature(0.75)
            .with_tool_choice(ToolChoice::Required);

        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.system.as_deref(), Some("you are a novelist"));
        assert_eq!(req.max_tokens, 2048);
        assert_eq!(req.temperature, Some(0.75));
        assert_eq!(req.tool_choice, ToolChoice::Required);
    }

    #[test]
    fn reply_reports_tool_calls() {
        let reply = ModelReply::tool_call("update_structure", json!({"beat": "hook"}));
        assert!(reply.has_tool_calls());
        assert_eq!(reply.tool_calls[0].name, "update_structure");

        assert!(!ModelReply::text("just prose").has_tool_calls());
    }
}
