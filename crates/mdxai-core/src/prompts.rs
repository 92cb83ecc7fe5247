//! Prompt construction
//!
//! All prompt text the generator sends lives here so wording changes stay in
//! one place.

use crate::types::OutlineItem;
use std::fmt::Write as _;

const DOCUMENT_SYSTEM_PROMPT: &str = "\
You write MDX documents. Reply with the document only, without commentary.
Start with a YAML frontmatter block delimited by --- lines. Include a title and \
a one-sentence description. Add other fields only when they are relevant to the \
document type.
After the frontmatter, write a markdown body that opens with a level-one \
heading and uses level-two headings for sections.
Components are written as JSX elements with a capitalized name, for example \
<Callout type=\"info\">text</Callout>. Only use components you are told are \
available.";

const OUTLINE_SYSTEM_PROMPT: &str = "\
You plan documents. Reply with a JSON array only.";

/// System prompt for direct generation
#[must_use]
pub fn document_system_prompt(components: &[String]) -> String {
    let mut prompt = DOCUMENT_SYSTEM_PROMPT.to_string();
    if !components.is_empty() {
        let _ = write!(prompt, "\nAvailable components: {}.", components.join(", "));
    }
    prompt
}

/// System prompt for the outline stage
#[must_use]
pub fn outline_system_prompt() -> &'static str {
    OUTLINE_SYSTEM_PROMPT
}

/// User prompt for direct generation
#[must_use]
pub fn document_prompt(type_name: &str, topic: &str) -> String {
    format!("Write a {type_name} about: {topic}")
}

/// Outline elicitation prompt
#[must_use]
pub fn outline_prompt(type_name: &str, topic: &str, depth: u32) -> String {
    format!(
        "Create an outline for a {type_name} about: {topic}\n\
         Keep the outline flat for depth {depth}.\n\
         Reply with a flat JSON array of objects with the fields \"title\" (string) \
         and \"description\" (string)."
    )
}

/// Single composite topic covering every outline item
///
/// The result is used as the topic of a direct generation.
#[must_use]
pub fn expansion_prompt(topic: &str, outline: &[OutlineItem]) -> String {
    let mut prompt = format!("{topic}\n\nCover these sections in order:\n");
    for item in outline {
        push_item(&mut prompt, item, 0);
    }
    prompt
}

fn push_item(out: &mut String, item: &OutlineItem, level: usize) {
    let indent = "  ".repeat(level);
    match &item.description {
        Some(description) => {
            let _ = writeln!(out, "{indent}- {}: {description}", item.title);
        }
        None => {
            let _ = writeln!(out, "{indent}- {}", item.title);
        }
    }
    for child in item.children.iter().flatten() {
        push_item(out, child, level + 1);
    }
}
