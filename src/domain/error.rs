//! Domain error types.

/// A syntax error with position information for DSL parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the DSL text.
    pub position: usize,
    line: usize,
    column: usize,
}

impl ParseError {
    /// Build an error at `position`, resolving line and column against `input`.
    pub fn at(input: &str, position: usize, message: impl Into<String>) -> Self {
        let position = position.min(input.len());
        let before = &input[..position];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = input[line_start..position].chars().count() + 1;
        Self {
            message: message.into(),
            position,
            line,
            column,
        }
    }

    /// 1-based line number of the failure.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column (in characters) of the failure.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Format the error with the offending line and a caret under the failure column.
    pub fn display_with_context(&self, input: &str) -> String {
        let source_line = input.lines().nth(self.line - 1).unwrap_or("");
        let caret = " ".repeat(self.column - 1) + "^";
        format!(
            "{source_line}\n{caret}\n{err}",
            source_line = source_line,
            caret = caret,
            err = self
        )
    }
}

/// Errors raised while converting between the JSON condition schema and DSL text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("payload is an empty array")]
    EmptyPayload,

    #[error("payload must be an object with entry/exit lists")]
    NotAnObject,

    #[error("'{block}' must be a list")]
    NotAList { block: &'static str },

    #[error("{block}[{index}]: logic object has no preceding condition")]
    DanglingLogic { block: &'static str, index: usize },

    #[error("{block}[{index}]: logic object follows another logic object")]
    AdjacentLogic { block: &'static str, index: usize },

    #[error("{block}[{index}]: {reason}")]
    InvalidItem {
        block: &'static str,
        index: usize,
        reason: String,
    },
}

/// Failures of the external text-generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    #[error("translator request failed: {reason}")]
    Transport { reason: String },

    #[error("translator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("translator reply contained no text")]
    EmptyReply,

    #[error("translator reply is not valid JSON ({reason}); raw reply:\n{raw}")]
    MalformedReply { reason: String, raw: String },
}

/// Top-level error type for strategen.
#[derive(Debug, thiserror::Error)]
pub enum StrategenError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Translator(#[from] TranslatorError),

    #[error(transparent)]
    DslParse(#[from] ParseError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StrategenError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            StrategenError::Io(_) => 1,
            StrategenError::ConfigParse { .. }
            | StrategenError::ConfigMissing { .. }
            | StrategenError::ConfigInvalid { .. } => 2,
            StrategenError::Translator(_) => 3,
            StrategenError::DslParse(_) => 4,
            StrategenError::Bridge(_) => 5,
        }
    }
}

impl From<&StrategenError> for std::process::ExitCode {
    fn from(err: &StrategenError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
