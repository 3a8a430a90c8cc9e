//! Error types for the soiling alignment pipeline.
//!
//! Only configuration problems abort a run. Malformed rows, missing module
//! inputs and days without coverage are counted and logged by the stage that
//! meets them; the variants below exist so those stages can still describe
//! what happened when a caller asks for a strict failure.

use std::fmt;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Structured context for pipeline errors.
///
/// Records the stage and module that raised the error, plus free-form details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Pipeline stage (e.g. "reference", "join", "align")
    pub stage: Option<String>,
    /// Sensor module involved, if any
    pub module: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context for a pipeline stage.
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            ..Default::default()
        }
    }

    /// Set the module name.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref stage) = self.stage {
            parts.push(format!("stage={}", stage));
        }
        if let Some(ref module) = self.module {
            parts.push(format!("module={}", module));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid site, panel or threshold configuration. Fatal.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Timestamp that cannot be parsed or is ambiguous in its declared zone.
    #[error("Malformed timestamp: {message} {context}")]
    MalformedTimestamp {
        message: String,
        context: ErrorContext,
    },

    /// Series handed to a stage that requires ascending order.
    #[error("Unsorted series: {message} {context}")]
    UnsortedSeries {
        message: String,
        context: ErrorContext,
    },

    /// A module's whole input series is absent.
    #[error("Missing module input: {message} {context}")]
    MissingModuleInput {
        message: String,
        context: ErrorContext,
    },

    /// File access failure at the binary boundary.
    #[error("I/O error: {message} {context}")]
    Io {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or dataset document that cannot be decoded.
    #[error("Parse error: {message} {context}")]
    Parse {
        message: String,
        context: ErrorContext,
    },
}

impl PipelineError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::new("config"),
        }
    }

    /// Create a malformed-timestamp error.
    pub fn malformed_timestamp(message: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            message: message.into(),
            context: ErrorContext::new("parsing"),
        }
    }

    /// Create an unsorted-series error.
    pub fn unsorted(message: impl Into<String>) -> Self {
        Self::UnsortedSeries {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a missing-module-input error.
    pub fn missing_module(module: impl Into<String>) -> Self {
        let module = module.into();
        Self::MissingModuleInput {
            message: format!("no input series for module '{}'", module),
            context: ErrorContext::new("align").with_module(module),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Replace the error context.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        match self {
            Self::Configuration { message, .. } => Self::Configuration {
                message,
                context: ctx,
            },
            Self::MalformedTimestamp { message, .. } => Self::MalformedTimestamp {
                message,
                context: ctx,
            },
            Self::UnsortedSeries { message, .. } => Self::UnsortedSeries {
                message,
                context: ctx,
            },
            Self::MissingModuleInput { message, .. } => Self::MissingModuleInput {
                message,
                context: ctx,
            },
            Self::Io { message, .. } => Self::Io {
                message,
                context: ctx,
            },
            Self::Parse { message, .. } => Self::Parse {
                message,
                context: ctx,
            },
        }
    }

    /// Whether the run must abort on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Io { .. } | Self::Parse { .. }
        )
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Configuration { context, .. }
            | Self::MalformedTimestamp { context, .. }
            | Self::UnsortedSeries { context, .. }
            | Self::MissingModuleInput { context, .. }
            | Self::Io { context, .. }
            | Self::Parse { context, .. } => context,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            context: ErrorContext::default(),
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
            context: ErrorContext::new("config"),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
            context: ErrorContext::default(),
        }
    }
}
