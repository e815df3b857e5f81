use crate::events::registry::HandlerId;

// Registry misuse. Raised inside a dispatch pass it aborts the pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("handler {0} is already being added")]
    AlreadyAdding(HandlerId),

    #[error("handler {0} is being removed")]
    Removing(HandlerId),

    #[error("handler {0} is already added")]
    AlreadyActive(HandlerId),

    #[error("handler {0} is being added")]
    Adding(HandlerId),

    #[error("handler {0} is already being removed")]
    AlreadyRemoving(HandlerId),

    #[error("handler {0} is not added")]
    NotActive(HandlerId),

    #[error("no handler registered as {0}")]
    Unknown(HandlerId),
}

// Errors a handler may return from its callbacks
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

// Timeline errors
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeline invoked while a dispatch pass is in flight")]
    DispatchInProgress,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Handler {handler} failed: {source}")]
    Handler {
        handler: HandlerId,
        #[source]
        source: HandlerError,
    },
}

/// Failure to read a named field from a parsed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("field not found: {0}")]
    NotFound(String),

    #[error("field {name} is not an integer: {value:?}")]
    NotInteger { name: String, value: String },
}
