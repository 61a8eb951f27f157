//! Plain-text rendering for the terminal front end.

use crate::conversation::Message;
use crate::registry::RegistryView;
use crate::rich_text::Block;
use crate::rich_text::Inline;
use crate::staging::FileStaging;
use crate::staging::format_bytes;

pub const THINKING: &str = "Thinking…";

fn inline_text(content: &[Inline]) -> String {
    content
        .iter()
        .map(|inline| match inline {
            Inline::Text(s) => s.clone(),
            Inline::Emphasis(s) => format!("*{s}*"),
        })
        .collect()
}

fn wrap_into(out: &mut Vec<String>, text: &str, width: usize, first: &str, rest: &str) {
    let options = textwrap::Options::new(width.max(20))
        .initial_indent(first)
        .subsequent_indent(rest);
    out.extend(
        textwrap::wrap(text, options)
            .into_iter()
            .map(std::borrow::Cow::into_owned),
    );
}

pub fn render_message(message: &Message, width: usize) -> Vec<String> {
    let mut lines = vec![format!("{}:", message.sender().label())];
    for block in message.blocks() {
        match block {
            Block::Paragraph(content) => {
                wrap_into(&mut lines, &inline_text(&content), width, "  ", "  ");
            }
            Block::Bullet(content) => {
                wrap_into(&mut lines, &inline_text(&content), width, "  • ", "    ");
            }
            Block::Numbered { number, content } => {
                let marker = format!("  {number}. ");
                let hang = " ".repeat(marker.chars().count());
                wrap_into(&mut lines, &inline_text(&content), width, &marker, &hang);
            }
            Block::Citation(label) => lines.push(format!("  [source: {label}]")),
        }
    }
    lines
}

pub fn render_registry(view: RegistryView<'_>) -> Vec<String> {
    match view {
        RegistryView::Loading => vec!["Loading files…".to_string()],
        RegistryView::Failed(err) => vec![
            format!("Failed to load files: {err}"),
            "Type :files to retry.".to_string(),
        ],
        RegistryView::Empty => vec!["No files uploaded yet.".to_string()],
        RegistryView::Loaded(files) => {
            let mut lines = vec![format!("Uploaded files ({}):", files.len())];
            lines.extend(files.iter().map(|f| format!("  {}", f.name)));
            lines
        }
    }
}

pub fn render_staged(staging: &FileStaging) -> Vec<String> {
    if staging.is_empty() {
        return vec!["No files staged.".to_string()];
    }
    let mut lines: Vec<String> = staging
        .staged()
        .iter()
        .enumerate()
        .map(|(i, f)| format!("  [{i}] {} ({})", f.name, format_bytes(f.size_bytes)))
        .collect();
    lines.push(format!(
        "{} file(s), {} total",
        staging.len(),
        format_bytes(staging.total_bytes())
    ));
    lines
}
