mod mcp;
mod openai;
mod routes;

pub use mcp::{mcp, wants_event_stream};
pub use openai::{openai, OpenAiError};
pub use routes::{
    api, counter, counter_incr, d1, health, hello, index, kv, not_found, outbound_request, r2,
};
