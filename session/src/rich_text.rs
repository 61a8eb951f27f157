//! Assistant answers as display blocks.
//!
//! Answers are markdown-ish text. Raw HTML is never interpreted; it comes
//! through as literal text.

use pulldown_cmark::Event;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(String),
}

impl Inline {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Emphasis(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Bullet(Vec<Inline>),
    Numbered { number: u64, content: Vec<Inline> },
    /// A cited source document.
    Citation(String),
}

pub fn parse_answer(text: &str) -> Vec<Block> {
    let mut writer = BlockWriter::default();
    for event in Parser::new_ext(text, Options::empty()) {
        writer.handle_event(event);
    }
    writer.flush_paragraph();
    writer.blocks
}

/// `Source: x` or `[Source: x]` on a line of its own.
pub fn citation_label(text: &str) -> Option<String> {
    let text = text.trim();
    let text = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text)
        .trim();
    let (prefix, rest) = text.split_once(':')?;
    if !matches!(prefix.trim().to_ascii_lowercase().as_str(), "source" | "sources") {
        return None;
    }
    let label = rest.trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[derive(Clone, Copy, Debug)]
enum ItemKind {
    Bullet,
    Numbered(u64),
}

#[derive(Default)]
struct BlockWriter {
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    emphasis: usize,
    /// Next number for each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    items: Vec<ItemKind>,
}

impl BlockWriter {
    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.flush_paragraph(),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.items.is_empty() && !self.inlines.is_empty() {
                    self.push_text(" ");
                }
            }
            Tag::Heading { .. } | Tag::Emphasis | Tag::Strong => self.emphasis += 1,
            Tag::List(start) => {
                self.flush_block();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_block();
                let kind = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let number = *next;
                        *next += 1;
                        ItemKind::Numbered(number)
                    }
                    _ => ItemKind::Bullet,
                };
                self.items.push(kind);
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.items.is_empty() {
                    self.flush_paragraph();
                }
            }
            TagEnd::Heading(_) => {
                self.emphasis = self.emphasis.saturating_sub(1);
                self.flush_paragraph();
            }
            TagEnd::Emphasis | TagEnd::Strong => {
                self.emphasis = self.emphasis.saturating_sub(1);
            }
            TagEnd::Item => {
                self.flush_block();
                self.items.pop();
            }
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::BlockQuote => {
                if self.items.is_empty() {
                    self.flush_paragraph();
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let emphasized = self.emphasis > 0;
        match self.inlines.last_mut() {
            Some(Inline::Emphasis(s)) if emphasized => s.push_str(text),
            Some(Inline::Text(s)) if !emphasized => s.push_str(text),
            _ if emphasized => self.inlines.push(Inline::Emphasis(text.to_string())),
            _ => self.inlines.push(Inline::Text(text.to_string())),
        }
    }

    fn take_inlines(&mut self) -> Option<Vec<Inline>> {
        let mut inlines = std::mem::take(&mut self.inlines);
        if let Some(first) = inlines.first_mut() {
            trim_inline(first, str::trim_start);
        }
        if let Some(last) = inlines.last_mut() {
            trim_inline(last, str::trim_end);
        }
        inlines.retain(|i| !i.as_str().is_empty());
        (!inlines.is_empty()).then_some(inlines)
    }

    /// Close whatever is accumulating: the current item if inside a list.
    fn flush_block(&mut self) {
        match self.items.last().copied() {
            Some(kind) => {
                if let Some(content) = self.take_inlines() {
                    self.blocks.push(match kind {
                        ItemKind::Bullet => Block::Bullet(content),
                        ItemKind::Numbered(number) => Block::Numbered { number, content },
                    });
                }
            }
            None => self.flush_paragraph(),
        }
    }

    fn flush_paragraph(&mut self) {
        let Some(content) = self.take_inlines() else {
            return;
        };
        let plain: String = content.iter().map(Inline::as_str).collect();
        match citation_label(&plain) {
            Some(label) => self.blocks.push(Block::Citation(label)),
            None => self.blocks.push(Block::Paragraph(content)),
        }
    }
}

fn trim_inline(inline: &mut Inline, trim: fn(&str) -> &str) {
    let (Inline::Text(s) | Inline::Emphasis(s)) = inline;
    let trimmed = trim(s);
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}
