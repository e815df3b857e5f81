use crate::events::TimelineError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("{0} is not a valid control spec")]
    InvalidSpec(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookError {
    #[error("invalid maxoutstyle: {0:?}")]
    InvalidMaxoutStyle(String),

    #[error("{look} expects {expected}, got {got}")]
    ValueShape {
        look: &'static str,
        expected: &'static str,
        got: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Look error in control {control}: {source}")]
    Look {
        control: String,
        #[source]
        source: LookError,
    },

    #[error("State store handler is missing from the timeline")]
    MissingStateStore,

    #[error("Failed to emit frame: {0}")]
    Sink(#[from] std::io::Error),
}
