//! Markdown body ⇄ node sequence
//!
//! Uses pulldown-cmark offsets to cut the body into top-level blocks. Each
//! block keeps enough source to be rendered back without reordering.

use crate::document::BodyNode;
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as MdParser, Tag};
use regex::Regex;
use std::ops::Range;

static COMPONENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<([A-Z][A-Za-z0-9_.]*)[\s/>]").expect("component pattern is valid")
});

/// Name of the component opened by `source`, if it starts with `<Capitalized`
#[must_use]
pub fn component_name(source: &str) -> Option<String> {
    COMPONENT_RE
        .captures(source.trim_start())
        .map(|caps| caps[1].to_string())
}

#[derive(Debug)]
enum BlockKind {
    Heading(u8),
    Code(Option<String>),
    Html,
    Other,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    range: Range<usize>,
    code: String,
}

impl Block {
    fn start(tag: &Tag<'_>, range: Range<usize>) -> Self {
        let kind = match tag {
            Tag::Heading { level, .. } => BlockKind::Heading(*level as u8),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let lang = info.split_whitespace().next().unwrap_or("");
                BlockKind::Code((!lang.is_empty()).then(|| lang.to_string()))
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => BlockKind::Code(None),
            Tag::HtmlBlock => BlockKind::Html,
            _ => BlockKind::Other,
        };
        Self {
            kind,
            range,
            code: String::new(),
        }
    }

    fn finish(self, source: &str) -> BodyNode {
        let raw = source[self.range].trim_end();
        match self.kind {
            BlockKind::Heading(depth) => BodyNode::Heading {
                depth,
                text: heading_text(raw),
            },
            BlockKind::Code(lang) => BodyNode::code(lang.as_deref(), self.code),
            // JSX attributes like `data={[1, 2]}` turn a component into a
            // paragraph rather than an HTML block, so both are checked
            BlockKind::Html | BlockKind::Other => match component_name(raw) {
                Some(name) => BodyNode::Component {
                    name,
                    source: raw.to_string(),
                },
                None => BodyNode::text(raw),
            },
        }
    }
}

/// Heading text from ATX (`## Text ##`) or setext (`Text\n===`) source
fn heading_text(raw: &str) -> String {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('#') {
        let text = trimmed.trim_start_matches('#').trim();
        // optional closing sequence
        let without_closing = text.trim_end_matches('#');
        if without_closing.ends_with(' ') || without_closing.is_empty() {
            without_closing.trim_end().to_string()
        } else {
            text.to_string()
        }
    } else {
        trimmed.lines().next().unwrap_or("").trim().to_string()
    }
}

/// Parse markdown body into top-level nodes
#[must_use]
pub fn parse_body(markdown: &str) -> Vec<BodyNode> {
    let parser = MdParser::new_ext(markdown, Options::empty()).into_offset_iter();

    let mut nodes = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<Block> = None;

    for (event, range) in parser {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    current = Some(Block::start(&tag, range));
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(block) = current.take() {
                        nodes.push(block.finish(markdown));
                    }
                }
            }
            Event::Text(text) => {
                if let Some(Block {
                    kind: BlockKind::Code(_),
                    code,
                    ..
                }) = current.as_mut()
                {
                    code.push_str(&text);
                }
            }
            Event::Rule if depth == 0 => nodes.push(BodyNode::ThematicBreak),
            _ => {}
        }
    }

    nodes
}

/// Render nodes back to markdown, blocks separated by a blank line
#[must_use]
pub fn render_body(nodes: &[BodyNode]) -> String {
    let mut out = nodes
        .iter()
        .map(BodyNode::render)
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
