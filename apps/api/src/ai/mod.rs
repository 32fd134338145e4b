//! Streamed AI features: resume review, job match, and cover letters.
//!
//! Every call is plan-gated by the monthly AI counter. The model's output is
//! relayed to the client as it is generated.

pub mod context;
pub mod handlers;
pub mod prompts;
pub mod stream;
