/// Core error type for the toolbox system.
///
/// Tool handlers only return these for unexpected failures; invalid input is
/// reported through a 4xx [`HandlerResponse`](crate::HandlerResponse) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("database error: {0}")]
    Database(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}
