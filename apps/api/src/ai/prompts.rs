// Prompt constants for the AI endpoints.
// Shared output and grounding fragments come from llm_client::prompts.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, MARKDOWN_OUTPUT_INSTRUCTION};

pub const RESUME_REVIEW_SYSTEM: &str = "You are an experienced technical recruiter and \
    resume coach. You review resumes candidly and give specific, actionable feedback.";

/// Replace `{resume}` before sending.
pub const RESUME_REVIEW_TEMPLATE: &str = r#"Review the resume below.

Structure your answer with these sections:
1. Overall impression (2-3 sentences)
2. Strengths
3. Weaknesses and gaps
4. Concrete rewrites for the three weakest lines
5. A score from 1 to 10 with a one-line justification

RESUME:
{resume}"#;

pub const JOB_MATCH_SYSTEM: &str = "You are a hiring manager screening candidates. \
    You compare a resume against a job posting and judge fit honestly.";

/// Replace `{resume}` and `{job}` before sending.
pub const JOB_MATCH_TEMPLATE: &str = r#"Assess how well this candidate matches the job.

Structure your answer with these sections:
1. Match score from 0 to 100
2. Requirements the candidate clearly meets
3. Requirements that are missing or unclear
4. What to emphasize in the application
5. Suggested resume changes for this role

JOB:
{job}

RESUME:
{resume}"#;

pub const COVER_LETTER_SYSTEM: &str = "You are a professional career writer. \
    You write concise, specific cover letters in a confident first-person voice.";

/// Replace `{resume}`, `{job}` and `{template}` before sending.
pub const COVER_LETTER_TEMPLATE: &str = r#"Write a cover letter for this candidate applying to the job below.

Keep it under 400 words in three to five paragraphs. Open with the role and company.
Tie two or three concrete achievements from the resume to the job's needs.
Output only the letter text, starting with the greeting.

{template}JOB:
{job}

RESUME:
{resume}"#;

/// Template section for cover letters; empty when no template is chosen.
pub fn template_section(template: Option<&str>) -> String {
    match template.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!(
            "Follow the structure and tone of this template, replacing its placeholders:\n{t}\n\n"
        ),
        None => String::new(),
    }
}

/// Full system prompt: role plus the shared grounding and format rules.
pub fn system_prompt(role: &str, markdown: bool) -> String {
    if markdown {
        format!("{role}\n\n{GROUNDING_INSTRUCTION}\n\n{MARKDOWN_OUTPUT_INSTRUCTION}")
    } else {
        format!("{role}\n\n{GROUNDING_INSTRUCTION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_placeholders() {
        assert!(RESUME_REVIEW_TEMPLATE.contains("{resume}"));
        for t in [JOB_MATCH_TEMPLATE, COVER_LETTER_TEMPLATE] {
            assert!(t.contains("{resume}") && t.contains("{job}"));
        }
        assert!(COVER_LETTER_TEMPLATE.contains("{template}"));
    }

    #[test]
    fn test_template_section() {
        assert_eq!(template_section(None), "");
        assert_eq!(template_section(Some("  ")), "");
        assert!(template_section(Some("Dear [Name]")).contains("Dear [Name]"));
    }

    #[test]
    fn test_system_prompt_format_rules() {
        assert!(system_prompt(RESUME_REVIEW_SYSTEM, true).contains(MARKDOWN_OUTPUT_INSTRUCTION));
        assert!(!system_prompt(COVER_LETTER_SYSTEM, false).contains(MARKDOWN_OUTPUT_INSTRUCTION));
    }
}
