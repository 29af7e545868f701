//! Per-call execution context.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Cancellation plus per-call provider tokens.
///
/// Tokens set here take precedence over the engine's shared token map, so a
/// caller can pin its own credentials without racing other executions.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancel: CancellationToken,
    tokens: HashMap<String, String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tokens: HashMap::new(),
        }
    }

    /// Use an existing token, e.g. a child of the server's shutdown token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            tokens: HashMap::new(),
        }
    }

    pub fn with_token(mut self, provider: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(provider.into(), token.into());
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token_for(&self, provider: &str) -> Option<&str> {
        self.tokens.get(provider).map(String::as_str)
    }
}
