// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Output-format instruction for responses streamed straight to the browser.
pub const MARKDOWN_OUTPUT_INSTRUCTION: &str = "\
    Format your answer as concise Markdown with short headings and bullet lists. \
    Do NOT wrap the answer in code fences. \
    Do NOT include a preamble or closing remarks.";

/// Instruction that keeps the model inside the supplied material.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base every statement on the resume and job details provided. \
    Do NOT invent employers, dates, credentials, or metrics. \
    If information is missing, say so instead of guessing.";
