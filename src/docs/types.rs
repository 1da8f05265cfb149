//! Wire model for the Docs REST subset the engine uses.
//!
//! Request objects serialize as single-key maps (`{"insertText": {...}}`),
//! which is exactly how serde renders an externally tagged enum. Replies
//! come back positionally aligned with the request list; only the
//! `createNamedRange` reply carries data the engine cares about.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::translate::{DocOp, TextStyle};

/// Half-open span of document text, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub end_index: u32,
}

impl Range {
    pub fn new(start_index: u32, end_index: u32) -> Self {
        Self {
            start_index,
            end_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    pub named_style_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RgbColor {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub rgb_color: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionalColor {
    pub color: Color,
}

/// Standard link blue.
pub const LINK_COLOR: RgbColor = RgbColor {
    red: 0.066,
    green: 0.33,
    blue: 0.8,
};

/// Checklist glyphs align only in a fixed-width font.
pub const CHECKLIST_FONT: &str = "Courier New";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFontFamily {
    pub font_family: String,
}

/// `textStyle` payload; only the touched fields serialize, and `fields`
/// on the enclosing request must name exactly those.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<OptionalColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_font_family: Option<WeightedFontFamily>,
}

impl WireTextStyle {
    pub fn from_style(style: &TextStyle) -> Self {
        let mut wire = Self::default();
        if style.bold {
            wire.bold = Some(true);
        }
        if style.italic {
            wire.italic = Some(true);
        }
        if style.underline || style.link.is_some() {
            wire.underline = Some(true);
        }
        if let Some(url) = &style.link {
            wire.link = Some(Link { url: url.clone() });
            wire.foreground_color = Some(OptionalColor {
                color: Color {
                    rgb_color: LINK_COLOR,
                },
            });
        }
        if style.monospace {
            wire.weighted_font_family = Some(WeightedFontFamily {
                font_family: CHECKLIST_FONT.to_string(),
            });
        }
        wire
    }

    /// The `fields` mask matching the populated members.
    pub fn fields(&self) -> String {
        let mut fields = Vec::new();
        if self.bold.is_some() {
            fields.push("bold");
        }
        if self.italic.is_some() {
            fields.push("italic");
        }
        if self.underline.is_some() {
            fields.push("underline");
        }
        if self.link.is_some() {
            fields.push("link");
        }
        if self.foreground_color.is_some() {
            fields.push("foregroundColor");
        }
        if self.weighted_font_family.is_some() {
            fields.push("weightedFontFamily");
        }
        fields.join(",")
    }
}

/// One batch-update request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    InsertText {
        location: Location,
        text: String,
    },
    DeleteContentRange {
        range: Range,
    },
    UpdateTextStyle {
        range: Range,
        text_style: WireTextStyle,
        fields: String,
    },
    UpdateParagraphStyle {
        range: Range,
        paragraph_style: ParagraphStyle,
        fields: String,
    },
    CreateParagraphBullets {
        range: Range,
        bullet_preset: String,
    },
    CreateNamedRange {
        name: String,
        range: Range,
    },
}

impl Request {
    /// Lower a translator op into a request, shifting its span from
    /// text-relative offsets to the destination position.
    pub fn from_op(op: &DocOp, shift: u32) -> Self {
        match op {
            DocOp::Style { range, style } => {
                let wire = WireTextStyle::from_style(style);
                let fields = wire.fields();
                Request::UpdateTextStyle {
                    range: Range::new(shift + range.start as u32, shift + range.end as u32),
                    text_style: wire,
                    fields,
                }
            }
            DocOp::Bullets { range, preset } => Request::CreateParagraphBullets {
                range: Range::new(shift + range.start as u32, shift + range.end as u32),
                bullet_preset: preset.as_api_str().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub create_named_range: Option<CreateNamedRangeReply>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNamedRangeReply {
    pub named_range_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// `GET documents/{id}?fields=namedRanges` projection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRangesDoc {
    #[serde(default)]
    pub named_ranges: HashMap<String, NamedRangeList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRangeList {
    #[serde(default)]
    pub named_ranges: Vec<NamedRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRange {
    #[serde(default)]
    pub named_range_id: Option<String>,
    #[serde(default)]
    pub ranges: Vec<Range>,
}

/// `GET documents/{id}?fields=body.content` projection.
#[derive(Debug, Default, Deserialize)]
pub struct BodyDoc {
    #[serde(default)]
    pub body: Body,
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    #[serde(default)]
    pub end_index: u32,
}

/// Error envelope Google wraps failures in.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{BulletPreset, OpRange};

    #[test]
    fn test_request_serializes_as_single_key_map() {
        let req = Request::InsertText {
            location: Location { index: 5 },
            text: "hi".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "insertText": {"location": {"index": 5}, "text": "hi"}
            })
        );
    }

    #[test]
    fn test_style_op_lowering_shifts_and_masks() {
        let op = DocOp::Style {
            range: OpRange::new(0, 2),
            style: TextStyle {
                bold: true,
                ..TextStyle::default()
            },
        };
        let json = serde_json::to_value(Request::from_op(&op, 10)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "updateTextStyle": {
                    "range": {"startIndex": 10, "endIndex": 12},
                    "textStyle": {"bold": true},
                    "fields": "bold"
                }
            })
        );
    }

    #[test]
    fn test_link_style_carries_color_and_underline() {
        let wire = WireTextStyle::from_style(&TextStyle {
            link: Some("https://example.com".to_string()),
            ..TextStyle::default()
        });
        assert_eq!(wire.underline, Some(true));
        assert!(wire.foreground_color.is_some());
        assert_eq!(wire.fields(), "underline,link,foregroundColor");
    }

    #[test]
    fn test_bullet_op_lowering() {
        let op = DocOp::Bullets {
            range: OpRange::new(1, 4),
            preset: BulletPreset::Numbered,
        };
        let json = serde_json::to_value(Request::from_op(&op, 0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "createParagraphBullets": {
                    "range": {"startIndex": 1, "endIndex": 4},
                    "bulletPreset": "NUMBERED_DECIMAL_ALPHA_ROMAN"
                }
            })
        );
    }

    #[test]
    fn test_reply_parses_with_missing_members() {
        let response: BatchUpdateResponse = serde_json::from_str(
            r#"{"replies": [{}, {"createNamedRange": {"namedRangeId": "kix.abc"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.replies.len(), 2);
        assert!(response.replies[0].create_named_range.is_none());
        assert_eq!(
            response.replies[1]
                .create_named_range
                .as_ref()
                .unwrap()
                .named_range_id,
            "kix.abc"
        );
    }

    #[test]
    fn test_named_ranges_doc_parses() {
        let doc: NamedRangesDoc = serde_json::from_str(
            r#"{"namedRanges": {"abc": {"namedRanges": [
                {"namedRangeId": "kix.1", "ranges": [{"startIndex": 3, "endIndex": 9}]}
            ]}}}"#,
        )
        .unwrap();
        let list = doc.named_ranges.get("abc").unwrap();
        assert_eq!(
            list.named_ranges[0].ranges[0],
            Range::new(3, 9)
        );
    }
}
