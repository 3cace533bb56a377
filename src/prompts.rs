//! Prompt templates and server instructions

use crate::protocol::{GetPromptResult, PromptArgument, PromptDefinition, PromptMessage, TextContent};
use crate::{NotesError, Result};
use std::collections::HashMap;

pub const CLARIFY_PROMPT: &str = "teach_clarify";

/// Sent to the client in the `initialize` result
pub const SERVER_INSTRUCTIONS: &str = "\
Notekeeper stores the user's words verbatim in an append-only file.
- Never store anything without asking first. Show the user the exact text, wait for an explicit yes, \
then call the store tool with approved=true.
- Never summarize, shorten, reorder or fix the wording of stored text.
- Notes cannot be edited or deleted through these tools.
- Use echo_question to repeat a question back to the user unchanged.";

const CLARIFY_QUESTIONS: &str = "\
Before explaining anything, ask me these clarifying questions one at a time and wait for each answer:
1. What do you already know about this?
2. What are you trying to build or fix right now?
3. Do you want a short explanation, a worked example, or both?
4. Which parts, if any, should be saved as teaching notes word for word?
Do not store anything until I have approved the exact text.";

pub fn definitions() -> Vec<PromptDefinition> {
    vec![PromptDefinition {
        name: CLARIFY_PROMPT.to_string(),
        description: "Ask clarifying questions before teaching a topic".to_string(),
        arguments: vec![PromptArgument {
            name: "topic".to_string(),
            description: "What the user wants to learn".to_string(),
            required: false,
        }],
    }]
}

/// The clarifying-questions script, optionally naming a topic
pub fn clarify_script(topic: Option<&str>) -> String {
    let opening = match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("I want to learn about {}.", topic),
        None => "I want to learn something new.".to_string(),
    };
    format!("{}\n\n{}", opening, CLARIFY_QUESTIONS)
}

pub fn render(name: &str, arguments: Option<&HashMap<String, String>>) -> Result<GetPromptResult> {
    if name != CLARIFY_PROMPT {
        return Err(NotesError::UnknownPrompt(name.to_string()));
    }

    let topic = arguments.and_then(|args| args.get("topic")).map(String::as_str);
    Ok(GetPromptResult {
        description: "Clarifying questions before teaching".to_string(),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: TextContent::new(clarify_script(topic)),
        }],
    })
}
