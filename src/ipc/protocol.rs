//! Wire protocol: newline-delimited JSON over a Unix socket.
//!
//! Request: `{"cmd": "...", "agent_id"?: "...", "config"?: {...}}`
//! Response: `{"status": "ok"|"error", "message"?, "agent"?, "agents"?}`
//!
//! Error responses also carry `error_kind`, the snake_case error variant, so
//! clients can tell a lifecycle conflict from a bad request.

use crate::config::AgentConfig;
use crate::error::{Result, WardenError};
use crate::supervisor::AgentRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted request line, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Names of the supported commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    List,
    Register,
    Start,
    Stop,
    Status,
    Remove,
    Shutdown,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::List => "list",
            Self::Register => "register",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::Remove => "remove",
            Self::Shutdown => "shutdown",
        }
    }
}

impl FromStr for CommandKind {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ping" => Ok(Self::Ping),
            "list" => Ok(Self::List),
            "register" => Ok(Self::Register),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            "remove" => Ok(Self::Remove),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(WardenError::InvalidRequest(format!("Unknown command: {}", other))),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    List,
    Shutdown,
    Register {
        agent_id: String,
        config: Option<AgentConfig>,
    },
    Start {
        agent_id: String,
        config: Option<AgentConfig>,
    },
    Stop {
        agent_id: String,
    },
    Status {
        agent_id: String,
    },
    Remove {
        agent_id: String,
    },
}

impl Request {
    /// Parse one request line.
    ///
    /// Every failure is an `InvalidRequest` whose message is sent back to
    /// the client verbatim.
    pub fn parse(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| WardenError::InvalidRequest(format!("Invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(WardenError::InvalidRequest(
                "Request must be a JSON object".to_string(),
            ));
        };

        let kind: CommandKind = match fields.remove("cmd") {
            Some(Value::String(cmd)) => cmd.parse()?,
            Some(_) => {
                return Err(WardenError::InvalidRequest(
                    "Command must be a string".to_string(),
                ));
            }
            None => return Err(WardenError::InvalidRequest("Missing cmd".to_string())),
        };

        let agent_id = match fields.remove("agent_id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            None | Some(Value::Null) => None,
            Some(_) => {
                return Err(WardenError::InvalidRequest(
                    "agent_id must be a non-empty string".to_string(),
                ));
            }
        };

        let config = match fields.remove("config") {
            None | Some(Value::Null) => None,
            Some(value) => Some(AgentConfig::from_value(value)?),
        };

        Ok(match (kind, agent_id) {
            (CommandKind::Ping, _) => Request::Ping,
            (CommandKind::List, _) => Request::List,
            (CommandKind::Shutdown, _) => Request::Shutdown,
            (_, None) => {
                return Err(WardenError::InvalidRequest("agent_id required".to_string()));
            }
            (CommandKind::Register, Some(agent_id)) => Request::Register { agent_id, config },
            (CommandKind::Start, Some(agent_id)) => Request::Start { agent_id, config },
            (CommandKind::Stop, Some(agent_id)) => Request::Stop { agent_id },
            (CommandKind::Status, Some(agent_id)) => Request::Status { agent_id },
            (CommandKind::Remove, Some(agent_id)) => Request::Remove { agent_id },
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Request::Ping => CommandKind::Ping,
            Request::List => CommandKind::List,
            Request::Shutdown => CommandKind::Shutdown,
            Request::Register { .. } => CommandKind::Register,
            Request::Start { .. } => CommandKind::Start,
            Request::Stop { .. } => CommandKind::Stop,
            Request::Status { .. } => CommandKind::Status,
            Request::Remove { .. } => CommandKind::Remove,
        }
    }

    /// Wire form of the request.
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("cmd".to_string(), Value::from(self.kind().as_str()));

        let (agent_id, config) = match self {
            Request::Ping | Request::List | Request::Shutdown => (None, None),
            Request::Register { agent_id, config } | Request::Start { agent_id, config } => {
                (Some(agent_id), config.as_ref())
            }
            Request::Stop { agent_id }
            | Request::Status { agent_id }
            | Request::Remove { agent_id } => (Some(agent_id), None),
        };
        if let Some(agent_id) = agent_id {
            fields.insert("agent_id".to_string(), Value::from(agent_id.as_str()));
        }
        if let Some(config) = config
            && let Ok(config) = serde_json::to_value(config)
        {
            fields.insert("config".to_string(), config);
        }

        Value::Object(fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Wire view of an agent: the persisted record plus the live PID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    #[serde(flatten)]
    pub record: AgentRecord,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl AgentView {
    pub fn new(record: AgentRecord, pid: Option<u32>) -> Self {
        Self { record, pid }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentView>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<AgentView>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Ok,
            message: None,
            agent: None,
            agents: None,
            error_kind: None,
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn with_agent(agent: AgentView) -> Self {
        Self {
            agent: Some(agent),
            ..Self::ok()
        }
    }

    pub fn with_agents(agents: Vec<AgentView>) -> Self {
        Self {
            agents: Some(agents),
            ..Self::ok()
        }
    }

    pub fn error(err: &WardenError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Self::ok()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    /// Turn an `error` response into `WardenError::Remote`.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            ResponseStatus::Ok => Ok(self),
            ResponseStatus::Error => Err(WardenError::Remote {
                kind: self.error_kind,
                message: self
                    .message
                    .unwrap_or_else(|| "daemon reported an error".to_string()),
            }),
        }
    }

    /// Serialize as one newline-terminated frame.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","message":"failed to encode response: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        });
        line.push('\n');
        line
    }
}
