//! Convert a Notion block tree into CommonMark/GFM

use super::types::{
    plain_text, Block, BlockKind, CodeBlock, FileBlock, LinkBlock, RichText, RichTextKind,
    TableBlock,
};

/// Indentation for blocks nested under list items, quotes and callouts
const NEST: &str = "    ";

/// Render a list of sibling blocks.
///
/// List items are joined by a single newline so runs stay tight; every
/// other block is separated by a blank line.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut prev_was_list = false;
    let mut number = 0usize;

    for block in blocks {
        if matches!(block.kind, BlockKind::NumberedListItem { .. }) {
            number += 1;
        } else {
            number = 0;
        }

        let rendered = render_block(block, number);
        if rendered.is_empty() {
            continue;
        }

        let is_list = is_list_item(&block.kind);
        if !out.is_empty() {
            out.push_str(if is_list && prev_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        prev_was_list = is_list;
    }

    out
}

/// Render rich text spans with their annotations
pub fn rich_text_to_markdown(parts: &[RichText]) -> String {
    parts.iter().map(span_to_markdown).collect()
}

fn span_to_markdown(span: &RichText) -> String {
    if span.kind == RichTextKind::Equation {
        let expression = span
            .equation
            .as_ref()
            .map(|e| e.expression.as_str())
            .unwrap_or(&span.plain_text);
        return format!("${}$", expression);
    }

    let text = span.plain_text.as_str();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return text.to_string();
    }
    // Emphasis markers must hug the text, so whitespace stays outside them
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];

    let a = &span.annotations;
    let mut inner = if a.code {
        code_span(trimmed)
    } else {
        trimmed.to_string()
    };
    if a.bold {
        inner = format!("**{}**", inner);
    }
    if a.italic {
        inner = format!("*{}*", inner);
    }
    if a.strikethrough {
        inner = format!("~~{}~~", inner);
    }
    if let Some(href) = span.href.as_deref().filter(|h| !h.is_empty()) {
        inner = format!("[{}]({})", inner, href);
    }

    format!("{}{}{}", lead, inner, trail)
}

fn code_span(text: &str) -> String {
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

fn is_list_item(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::BulletedListItem { .. }
            | BlockKind::NumberedListItem { .. }
            | BlockKind::ToDo { .. }
    )
}

fn render_block(block: &Block, number: usize) -> String {
    match &block.kind {
        BlockKind::Paragraph { paragraph } => {
            follow_with_children(rich_text_to_markdown(&paragraph.rich_text), block)
        }
        BlockKind::Heading1 { heading_1 } => heading(1, &heading_1.rich_text, block),
        BlockKind::Heading2 { heading_2 } => heading(2, &heading_2.rich_text, block),
        BlockKind::Heading3 { heading_3 } => heading(3, &heading_3.rich_text, block),
        BlockKind::BulletedListItem { bulleted_list_item } => nest_children(
            format!("- {}", rich_text_to_markdown(&bulleted_list_item.rich_text)),
            block,
        ),
        BlockKind::NumberedListItem { numbered_list_item } => nest_children(
            format!(
                "{}. {}",
                number.max(1),
                rich_text_to_markdown(&numbered_list_item.rich_text)
            ),
            block,
        ),
        BlockKind::ToDo { to_do } => nest_children(
            format!(
                "- [{}] {}",
                if to_do.checked { "x" } else { " " },
                rich_text_to_markdown(&to_do.rich_text)
            ),
            block,
        ),
        BlockKind::Quote { quote } => {
            blockquote(rich_text_to_markdown(&quote.rich_text), block)
        }
        BlockKind::Callout { callout } => {
            let text = rich_text_to_markdown(&callout.rich_text);
            let text = match callout.icon.as_ref().and_then(|i| i.emoji.as_deref()) {
                Some(emoji) => format!("{} {}", emoji, text),
                None => text,
            };
            blockquote(text, block)
        }
        BlockKind::Toggle { toggle } => {
            let summary = escape_html(&plain_text(&toggle.rich_text));
            let body = blocks_to_markdown(&block.children);
            if body.is_empty() {
                format!("<details>\n<summary>{}</summary>\n</details>", summary)
            } else {
                format!(
                    "<details>\n<summary>{}</summary>\n\n{}\n\n</details>",
                    summary, body
                )
            }
        }
        BlockKind::Code { code } => fenced_code(code),
        BlockKind::Equation { equation } => format!("$$\n{}\n$$", equation.expression),
        BlockKind::Divider => "---".to_string(),
        BlockKind::Image { image } => {
            let url = image.url();
            if url.is_empty() {
                String::new()
            } else {
                format!("![{}]({})", plain_text(&image.caption), url)
            }
        }
        BlockKind::Video { video: file }
        | BlockKind::File { file }
        | BlockKind::Pdf { pdf: file } => file_link(file),
        BlockKind::Bookmark { bookmark: link }
        | BlockKind::Embed { embed: link }
        | BlockKind::LinkPreview { link_preview: link } => link_block(link),
        BlockKind::Table { table } => render_table(table, &block.children),
        BlockKind::ChildPage { child_page } => format!("## {}", child_page.title),
        BlockKind::TableRow { .. } | BlockKind::TableOfContents => String::new(),
        // Columns and synced blocks only wrap other content
        BlockKind::Unsupported => blocks_to_markdown(&block.children),
    }
}

fn heading(level: usize, text: &[RichText], block: &Block) -> String {
    let head = format!("{} {}", "#".repeat(level), rich_text_to_markdown(text));
    follow_with_children(head, block)
}

/// Children rendered at the same level, after the block itself
fn follow_with_children(head: String, block: &Block) -> String {
    let children = blocks_to_markdown(&block.children);
    match (head.trim().is_empty(), children.is_empty()) {
        (_, true) => head,
        (true, false) => children,
        (false, false) => format!("{}\n\n{}", head, children),
    }
}

/// Children indented under a list item
fn nest_children(head: String, block: &Block) -> String {
    let children = blocks_to_markdown(&block.children);
    if children.is_empty() {
        return head;
    }
    let separator = match block.children.first() {
        Some(first) if is_list_item(&first.kind) => "\n",
        _ => "\n\n",
    };
    format!("{}{}{}", head, separator, indent(&children, NEST))
}

fn blockquote(text: String, block: &Block) -> String {
    let body = follow_with_children(text, block);
    body.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fenced_code(code: &CodeBlock) -> String {
    let source = plain_text(&code.rich_text);
    let longest_run = source
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!(
        "{}{}\n{}\n{}",
        fence,
        code_language(&code.language),
        source.trim_end_matches('\n'),
        fence
    )
}

/// Map a Notion code language name onto an info-string token
fn code_language(language: &str) -> String {
    match language.trim() {
        "" | "plain text" => "text".to_string(),
        other => other.to_ascii_lowercase().replace(' ', "-"),
    }
}

fn file_link(file: &FileBlock) -> String {
    let url = file.url();
    if url.is_empty() {
        return String::new();
    }
    let caption = plain_text(&file.caption);
    let label = if !caption.is_empty() {
        caption
    } else {
        file.name.clone().unwrap_or_else(|| url.to_string())
    };
    format!("[{}]({})", label, url)
}

fn link_block(link: &LinkBlock) -> String {
    if link.url.is_empty() {
        return String::new();
    }
    let caption = plain_text(&link.caption);
    let label = if caption.is_empty() {
        link.url.as_str()
    } else {
        caption.as_str()
    };
    format!("[{}]({})", label, link.url)
}

fn render_table(table: &TableBlock, rows: &[Block]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .filter_map(|row| match &row.kind {
            BlockKind::TableRow { table_row } => Some(
                table_row
                    .cells
                    .iter()
                    .map(|cell| table_cell(cell))
                    .collect(),
            ),
            _ => None,
        })
        .collect();

    if rows.is_empty() {
        return String::new();
    }

    let width = rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(table.table_width)
        .max(1);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(width)));
        }
    }
    lines.join("\n")
}

fn table_cell(cell: &[RichText]) -> String {
    rich_text_to_markdown(cell)
        .replace('|', "\\|")
        .replace('\n', "<br>")
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::types::{
        Annotations, CalloutBlock, Icon, TableRowBlock, TextBlock, ToDoBlock,
    };

    fn text(s: &str) -> Vec<RichText> {
        vec![RichText::text(s)]
    }

    fn paragraph(s: &str) -> Block {
        Block::new(BlockKind::Paragraph {
            paragraph: TextBlock { rich_text: text(s) },
        })
    }

    fn bullet(s: &str) -> Block {
        Block::new(BlockKind::BulletedListItem {
            bulleted_list_item: TextBlock { rich_text: text(s) },
        })
    }

    fn numbered(s: &str) -> Block {
        Block::new(BlockKind::NumberedListItem {
            numbered_list_item: TextBlock { rich_text: text(s) },
        })
    }

    #[test]
    fn test_annotations_keep_whitespace_outside() {
        let span = RichText {
            plain_text: "bold ".to_string(),
            annotations: Annotations {
                bold: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let link = RichText {
            plain_text: "site".to_string(),
            href: Some("https://example.com".to_string()),
            annotations: Annotations {
                italic: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let code = RichText {
            plain_text: "a`b".to_string(),
            annotations: Annotations {
                code: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let md = rich_text_to_markdown(&[span, link, RichText::text(" and "), code]);
        assert_eq!(md, "**bold** [*site*](https://example.com) and `` a`b ``");

        // Asterisks, since underscores do not emphasize inside a word
        let italic = RichText {
            plain_text: "日本語".to_string(),
            annotations: Annotations {
                italic: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            rich_text_to_markdown(&[RichText::text("これは"), italic, RichText::text("です")]),
            "これは*日本語*です"
        );
    }

    #[test]
    fn test_paragraphs_and_headings() {
        let blocks = vec![
            Block::new(BlockKind::Heading1 {
                heading_1: TextBlock {
                    rich_text: text("Title"),
                },
            }),
            paragraph("First"),
            Block::new(BlockKind::Heading3 {
                heading_3: TextBlock {
                    rich_text: text("Sub"),
                },
            }),
            Block::new(BlockKind::Divider),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks),
            "# Title\n\nFirst\n\n### Sub\n\n---"
        );
    }

    #[test]
    fn test_lists_are_tight_and_numbered() {
        let blocks = vec![
            numbered("one"),
            numbered("two"),
            paragraph("between"),
            numbered("again"),
            bullet("dot").with_children(vec![bullet("nested")]),
            Block::new(BlockKind::ToDo {
                to_do: ToDoBlock {
                    rich_text: text("done"),
                    checked: true,
                },
            }),
        ];
        assert_eq!(
            blocks_to_markdown(&blocks),
            "1. one\n2. two\n\nbetween\n\n1. again\n- dot\n    - nested\n- [x] done"
        );
    }

    #[test]
    fn test_list_item_with_paragraph_child() {
        let blocks = vec![bullet("parent").with_children(vec![paragraph("detail")])];
        assert_eq!(blocks_to_markdown(&blocks), "- parent\n\n    detail");
    }

    #[test]
    fn test_code_block_language_and_fence() {
        let block = Block::new(BlockKind::Code {
            code: CodeBlock {
                rich_text: text("let a = 1;\n"),
                language: "rust".to_string(),
                caption: Vec::new(),
            },
        });
        assert_eq!(blocks_to_markdown(&[block]), "```rust\nlet a = 1;\n```");

        let block = Block::new(BlockKind::Code {
            code: CodeBlock {
                rich_text: text("```\ninner\n```"),
                language: "plain text".to_string(),
                caption: Vec::new(),
            },
        });
        assert_eq!(
            blocks_to_markdown(&[block]),
            "````text\n```\ninner\n```\n````"
        );
    }

    #[test]
    fn test_quote_and_callout() {
        let quote = Block::new(BlockKind::Quote {
            quote: TextBlock {
                rich_text: text("line one\nline two"),
            },
        });
        let callout = Block::new(BlockKind::Callout {
            callout: CalloutBlock {
                rich_text: text("Note"),
                icon: Some(Icon {
                    emoji: Some("💡".to_string()),
                }),
            },
        });
        assert_eq!(
            blocks_to_markdown(&[quote, callout]),
            "> line one\n> line two\n\n> 💡 Note"
        );
    }

    #[test]
    fn test_toggle_and_image() {
        let toggle = Block::new(BlockKind::Toggle {
            toggle: TextBlock {
                rich_text: text("More <info>"),
            },
        })
        .with_children(vec![paragraph("hidden")]);
        let image = Block::new(BlockKind::Image {
            image: FileBlock {
                caption: text("cat"),
                external: Some(crate::notion::types::FileUrl {
                    url: "https://example.com/cat.png".to_string(),
                    expiry_time: None,
                }),
                ..Default::default()
            },
        });
        assert_eq!(
            blocks_to_markdown(&[toggle, image]),
            "<details>\n<summary>More &lt;info&gt;</summary>\n\nhidden\n\n</details>\n\n![cat](https://example.com/cat.png)"
        );
    }

    #[test]
    fn test_table() {
        let row = |cells: &[&str]| {
            Block::new(BlockKind::TableRow {
                table_row: TableRowBlock {
                    cells: cells.iter().map(|c| text(c)).collect(),
                },
            })
        };
        let table = Block::new(BlockKind::Table {
            table: TableBlock {
                table_width: 2,
                has_column_header: true,
                has_row_header: false,
            },
        })
        .with_children(vec![row(&["Name", "Kind"]), row(&["a|b", "x"])]);
        assert_eq!(
            blocks_to_markdown(&[table]),
            "| Name | Kind |\n| --- | --- |\n| a\\|b | x |"
        );
    }

    #[test]
    fn test_unsupported_blocks() {
        let column = Block::new(BlockKind::Unsupported).with_children(vec![paragraph("inside")]);
        let empty = Block::new(BlockKind::Unsupported);
        assert_eq!(
            blocks_to_markdown(&[empty, column, Block::new(BlockKind::TableOfContents)]),
            "inside"
        );
    }
}
