use thiserror::Error;

/// Errors at the session store boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid session record: {0}")]
    InvalidRecord(String),
}

/// Errors surfaced by an agent while servicing a prompt.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("prompt aborted")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// Errors delivered to the caller of a dispatched request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("model {model} timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("request evicted from a full channel queue")]
    Evicted,

    #[error("channel was reset before the request ran")]
    ChannelReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = DispatchError::Timeout {
            model: "anthropic/claude".to_string(),
            secs: 180,
        };
        assert_eq!(err.to_string(), "model anthropic/claude timed out after 180s");
    }

    #[test]
    fn test_agent_error_conversion() {
        let err: DispatchError = AgentError::Provider("503".to_string()).into();
        assert!(matches!(err, DispatchError::Agent(AgentError::Provider(_))));
        assert_eq!(err.to_string(), "agent error: provider error: 503");
    }

    #[test]
    fn test_session_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SessionError = io.into();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
