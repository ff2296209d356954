pub mod context;
pub mod error;
pub mod traits;
pub mod types;

pub use context::ExecutionContext;
pub use error::Error;
pub use types::{HandlerResponse, OutboundRequest, OutboundResponse};
