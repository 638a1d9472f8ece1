//! Wire types for the subset of the Notion API the blog reads

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cursor page of a list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedList<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A database row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl Page {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A typed property value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Date {
        date: Option<DateValue>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Select {
        select: Option<SelectOption>,
    },
    Checkbox {
        checkbox: bool,
    },
    Formula {
        formula: FormulaValue,
    },
    Url {
        url: Option<String>,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    /// Text content of text-like properties; empty for everything else
    pub fn plain_text(&self) -> String {
        match self {
            PropertyValue::Title { title } => plain_text(title),
            PropertyValue::RichText { rich_text } => plain_text(rich_text),
            PropertyValue::Formula {
                formula: FormulaValue::String { string },
            } => string.clone().unwrap_or_default(),
            PropertyValue::Url { url } => url.clone().unwrap_or_default(),
            PropertyValue::Select {
                select: Some(option),
            } => option.name.clone(),
            _ => String::new(),
        }
    }

    /// Start of a date property, or of a date-valued formula
    pub fn date_start(&self) -> Option<&str> {
        match self {
            PropertyValue::Date { date: Some(d) }
            | PropertyValue::Formula {
                formula: FormulaValue::Date { date: Some(d) },
            } => Some(d.start.as_str()),
            _ => None,
        }
    }

    /// Option names of a multi-select, in their stored order
    pub fn option_names(&self) -> Vec<String> {
        match self {
            PropertyValue::MultiSelect { multi_select } => {
                multi_select.iter().map(|o| o.name.clone()).collect()
            }
            PropertyValue::Select {
                select: Some(option),
            } => vec![option.name.clone()],
            _ => Vec::new(),
        }
    }
}

/// Result of a formula property
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A rich text span
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default)]
    pub kind: RichTextKind,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub equation: Option<Equation>,
}

impl RichText {
    /// Plain text span without annotations
    pub fn text(content: &str) -> Self {
        Self {
            plain_text: content.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RichTextKind {
    #[default]
    Text,
    Mention,
    Equation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Equation {
    #[serde(default)]
    pub expression: String,
}

/// Concatenate the plain text of a rich text array
pub fn plain_text(parts: &[RichText]) -> String {
    parts.iter().map(|p| p.plain_text.as_str()).collect()
}

/// A content block, with its children filled in by `NotionClient::block_tree`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(skip)]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: String::new(),
            has_children: false,
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph {
        paragraph: TextBlock,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextBlock,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextBlock,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextBlock,
    },
    BulletedListItem {
        bulleted_list_item: TextBlock,
    },
    NumberedListItem {
        numbered_list_item: TextBlock,
    },
    ToDo {
        to_do: ToDoBlock,
    },
    Toggle {
        toggle: TextBlock,
    },
    Quote {
        quote: TextBlock,
    },
    Callout {
        callout: CalloutBlock,
    },
    Code {
        code: CodeBlock,
    },
    Equation {
        equation: Equation,
    },
    Divider,
    Image {
        image: FileBlock,
    },
    Video {
        video: FileBlock,
    },
    File {
        file: FileBlock,
    },
    Pdf {
        pdf: FileBlock,
    },
    Bookmark {
        bookmark: LinkBlock,
    },
    Embed {
        embed: LinkBlock,
    },
    LinkPreview {
        link_preview: LinkBlock,
    },
    Table {
        table: TableBlock,
    },
    TableRow {
        table_row: TableRowBlock,
    },
    ChildPage {
        child_page: ChildPageBlock,
    },
    TableOfContents,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToDoBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalloutBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Icon {
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub caption: Vec<RichText>,
}

/// Image, video, file and pdf payloads; exactly one of `external`/`file` is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileBlock {
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(default)]
    pub external: Option<FileUrl>,
    #[serde(default)]
    pub file: Option<FileUrl>,
    #[serde(default)]
    pub name: Option<String>,
}

impl FileBlock {
    pub fn url(&self) -> &str {
        self.external
            .as_ref()
            .or(self.file.as_ref())
            .map(|f| f.url.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileUrl {
    pub url: String,
    #[serde(default)]
    pub expiry_time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub table_width: usize,
    #[serde(default)]
    pub has_column_header: bool,
    #[serde(default)]
    pub has_row_header: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRowBlock {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChildPageBlock {
    #[serde(default)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_JSON: &str = r#"{
        "object": "page",
        "id": "5a1d2c3b-0000-4000-8000-000000000001",
        "created_time": "2023-05-01T00:00:00.000Z",
        "last_edited_time": "2023-05-30T12:00:00.000Z",
        "archived": false,
        "properties": {
            "Name": {"id": "title", "type": "title", "title": [
                {"type": "text", "text": {"content": "Hello "}, "plain_text": "Hello ", "href": null,
                 "annotations": {"bold": false, "italic": false, "strikethrough": false, "underline": false, "code": false, "color": "default"}},
                {"type": "text", "text": {"content": "Rust"}, "plain_text": "Rust", "href": null}
            ]},
            "Slug": {"id": "a", "type": "formula", "formula": {"type": "string", "string": "hello-rust"}},
            "Date": {"id": "b", "type": "date", "date": {"start": "2023-05-30", "end": null, "time_zone": null}},
            "Tags": {"id": "c", "type": "multi_select", "multi_select": [
                {"id": "1", "name": "Rust", "color": "red"}, {"id": "2", "name": "Notion", "color": "blue"}
            ]},
            "Published": {"id": "d", "type": "checkbox", "checkbox": true},
            "Views": {"id": "e", "type": "rollup", "rollup": {"type": "number", "number": 3}}
        }
    }"#;

    #[test]
    fn test_decode_page_properties() {
        let page: Page = serde_json::from_str(PAGE_JSON).unwrap();
        assert_eq!(page.last_edited_time, "2023-05-30T12:00:00.000Z");
        assert_eq!(page.property("Name").unwrap().plain_text(), "Hello Rust");
        assert_eq!(page.property("Slug").unwrap().plain_text(), "hello-rust");
        assert_eq!(page.property("Date").unwrap().date_start(), Some("2023-05-30"));
        assert_eq!(
            page.property("Tags").unwrap().option_names(),
            vec!["Rust".to_string(), "Notion".to_string()]
        );
        assert!(matches!(
            page.property("Published"),
            Some(PropertyValue::Checkbox { checkbox: true })
        ));
        assert!(matches!(
            page.property("Views"),
            Some(PropertyValue::Unsupported)
        ));
    }

    #[test]
    fn test_decode_blocks() {
        let json = r#"{
            "object": "list",
            "results": [
                {"object": "block", "id": "b1", "type": "heading_2", "has_children": false,
                 "heading_2": {"rich_text": [{"type": "text", "plain_text": "Intro"}], "is_toggleable": false}},
                {"object": "block", "id": "b2", "type": "divider", "has_children": false, "divider": {}},
                {"object": "block", "id": "b3", "type": "code", "has_children": false,
                 "code": {"rich_text": [{"type": "text", "plain_text": "fn main() {}"}], "language": "rust", "caption": []}},
                {"object": "block", "id": "b4", "type": "image", "has_children": false,
                 "image": {"type": "external", "external": {"url": "https://example.com/a.png"}, "caption": []}},
                {"object": "block", "id": "b5", "type": "synced_block", "has_children": true, "synced_block": {}}
            ],
            "next_cursor": null,
            "has_more": false
        }"#;
        let list: PaginatedList<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(list.results.len(), 5);
        assert!(!list.has_more);
        assert!(matches!(list.results[0].kind, BlockKind::Heading2 { .. }));
        assert!(matches!(list.results[1].kind, BlockKind::Divider));
        match &list.results[2].kind {
            BlockKind::Code { code } => assert_eq!(code.language, "rust"),
            other => panic!("unexpected block {:?}", other),
        }
        match &list.results[3].kind {
            BlockKind::Image { image } => assert_eq!(image.url(), "https://example.com/a.png"),
            other => panic!("unexpected block {:?}", other),
        }
        assert!(matches!(list.results[4].kind, BlockKind::Unsupported));
        assert!(list.results[4].has_children);
    }
}
