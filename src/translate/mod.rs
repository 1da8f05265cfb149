//! Rich-text translation: HTML fragment → plain text + styling operations.
//!
//! Note bodies arrive as the HTML fragments a contenteditable editor
//! produces: `p`/`h1`–`h3`/`div` blocks, `ul`/`ol` lists, `b`/`i`/`u`
//! inline tags, anchors, and checklist `div`s carrying a `data-checked`
//! attribute. The translator flattens that tree into the exact text the
//! document will contain, with one newline between blocks, and emits typed
//! operations describing where styling and bullets apply.
//!
//! This is a pure function over the parsed tree; all I/O and index
//! shifting live in the save engine.

mod ops;

pub use ops::{utf16_len, BulletPreset, DocOp, OpRange, TextStyle};

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

/// Result of translating one note body.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    /// Flattened visible text, trimmed of leading/trailing whitespace.
    pub plain_text: String,
    /// Operations ordered by emission, offsets relative to `plain_text`.
    pub ops: Vec<DocOp>,
}

impl Translated {
    pub fn is_empty(&self) -> bool {
        self.plain_text.trim().is_empty()
    }
}

/// Translate an HTML fragment into plain text plus styling operations.
pub fn translate(html: &str) -> Translated {
    let fragment = Html::parse_fragment(html);
    let mut emitter = Emitter::default();

    for child in fragment.tree.root().children() {
        walk(child, &InlineStyle::default(), &mut emitter);
    }

    emitter.finish()
}

/// Inline styling inherited from ancestor tags during the walk.
#[derive(Debug, Clone, Default)]
struct InlineStyle {
    bold: bool,
    italic: bool,
    underline: bool,
    link: Option<String>,
}

impl InlineStyle {
    fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline && self.link.is_none()
    }

    fn to_text_style(&self) -> TextStyle {
        TextStyle {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            link: self.link.clone(),
            monospace: false,
        }
    }
}

fn walk(node: NodeRef<'_, Node>, inherited: &InlineStyle, out: &mut Emitter) {
    match node.value() {
        Node::Text(text) => {
            let span = out.append(&text.text);
            if !inherited.is_plain() && span.start < span.end {
                out.ops.push(DocOp::Style {
                    range: span,
                    style: inherited.to_text_style(),
                });
            }
        }
        Node::Element(element) => {
            let tag = element.name();

            // Checklist items are flattened, never recursed: glyph, text,
            // newline, one monospace span over the lot.
            if tag == "div" && element.attr("data-checked").is_some() {
                emit_checklist(node, out);
                return;
            }

            match tag {
                "b" | "strong" | "i" | "em" | "u" | "a" => {
                    let mut style = inherited.clone();
                    match tag {
                        "b" | "strong" => style.bold = true,
                        "i" | "em" => style.italic = true,
                        "u" => style.underline = true,
                        "a" => {
                            style.underline = true;
                            if let Some(href) = element.attr("href") {
                                style.link = Some(href.to_string());
                            }
                        }
                        _ => unreachable!(),
                    }
                    for child in node.children() {
                        walk(child, &style, out);
                    }
                }
                "p" | "h1" | "h2" | "h3" | "li" | "div" => {
                    out.ensure_block_boundary();
                    let start = out.len16;
                    for child in node.children() {
                        walk(child, inherited, out);
                    }
                    let end = out.len16;
                    // Empty items emit no bullet op: the API rejects
                    // zero-length ranges.
                    if tag == "li" && end > start {
                        out.ops.push(DocOp::Bullets {
                            range: OpRange::new(start, end),
                            preset: bullet_preset_for(node),
                        });
                    }
                }
                // Lists and unknown containers recurse transparently.
                _ => {
                    for child in node.children() {
                        walk(child, inherited, out);
                    }
                }
            }
        }
        _ => {
            for child in node.children() {
                walk(child, inherited, out);
            }
        }
    }
}

/// Bullet style from the nearest `ol`/`ul` ancestor of a list item.
fn bullet_preset_for(li: NodeRef<'_, Node>) -> BulletPreset {
    for ancestor in li.ancestors() {
        if let Node::Element(element) = ancestor.value() {
            match element.name() {
                "ol" => return BulletPreset::Numbered,
                "ul" => return BulletPreset::Disc,
                _ => {}
            }
        }
    }
    BulletPreset::Disc
}

fn emit_checklist(node: NodeRef<'_, Node>, out: &mut Emitter) {
    let checked = node
        .value()
        .as_element()
        .and_then(|e| e.attr("data-checked"))
        .map(|v| v == "true")
        .unwrap_or(false);

    let mut text = String::new();
    for descendant in node.descendants() {
        if let Node::Text(t) = descendant.value() {
            text.push_str(&t.text);
        }
    }
    let text = normalize(&text);
    let text = text.trim();

    out.ensure_block_boundary();
    let start = out.len16;
    out.append_raw(if checked { "[x] " } else { "[ ] " });
    out.append_raw(text);
    out.append_raw("\n");
    let end = out.len16;

    out.ops.push(DocOp::Style {
        range: OpRange::new(start, end),
        style: TextStyle {
            monospace: true,
            ..TextStyle::default()
        },
    });
}

/// Non-breaking spaces from the editor become plain spaces.
fn normalize(s: &str) -> String {
    s.replace('\u{a0}', " ")
}

#[derive(Debug, Default)]
struct Emitter {
    text: String,
    /// Cursor in UTF-16 code units; tracked incrementally so every emitted
    /// range is already in API units.
    len16: usize,
    ops: Vec<DocOp>,
}

impl Emitter {
    /// Append a text leaf (normalized) and return its UTF-16 span.
    fn append(&mut self, s: &str) -> OpRange {
        let start = self.len16;
        self.append_raw(&normalize(s));
        OpRange::new(start, self.len16)
    }

    fn append_raw(&mut self, s: &str) {
        self.len16 += utf16_len(s);
        self.text.push_str(s);
    }

    /// Blocks start on a fresh line; consecutive boundaries never stack
    /// more than one newline, and an empty buffer gets none.
    fn ensure_block_boundary(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.append_raw("\n");
        }
    }

    fn finish(self) -> Translated {
        let Emitter { text, ops, .. } = self;

        // Ops were emitted against the untrimmed buffer. Block separators
        // are internal, so a leading prefix is rare (a bare text leaf of
        // whitespace), but when one exists every offset shifts with it.
        let lead_bytes = text.len() - text.trim_start().len();
        let lead16 = utf16_len(&text[..lead_bytes]);

        let mut ops = ops;
        if lead16 > 0 {
            ops.retain(|op| op.range().end > lead16);
            for op in &mut ops {
                op.shift_left(lead16);
            }
        }

        Translated {
            plain_text: text.trim().to_string(),
            ops,
        }
    }
}
