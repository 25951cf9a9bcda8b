//! Typed compressed analysis document.
//!
//! Every field is optional on the wire. Absent or `null` values deserialize to
//! defaults, and the accessors on [`AnalysisResult`] never fail: missing data
//! is represented as an empty slice, `0`, `None` or the literal `"unknown"`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "de::nullable")]
    pub colors: Vec<ColorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<Elements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Sections>,
}

impl AnalysisResult {
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn colors(&self) -> &[ColorEntry] {
        &self.colors
    }

    pub fn layout_type(&self) -> Option<&LayoutType> {
        self.layout.as_ref().and_then(|l| l.layout_type.as_ref())
    }

    pub fn layout_summary(&self) -> Option<&LayoutSummary> {
        self.layout.as_ref().and_then(|l| l.summary.as_ref())
    }

    pub fn text_blocks(&self) -> &[TextBlock] {
        self.text.as_ref().map(|t| t.text_blocks.as_slice()).unwrap_or_default()
    }

    pub fn element_count(&self) -> u32 {
        self.elements.as_ref().map(|e| e.count).unwrap_or(0)
    }

    pub fn element_summary(&self) -> Option<&BTreeMap<String, u32>> {
        self.elements.as_ref().and_then(|e| e.summary.as_ref())
    }

    pub fn main_elements(&self) -> &[MainElement] {
        self.elements
            .as_ref()
            .map(|e| e.main_elements.as_slice())
            .unwrap_or_default()
    }

    /// Section list used for intent inference. Independent from
    /// `layout.summary.sectionSummaries`.
    pub fn section_items(&self) -> &[SectionItem] {
        self.sections
            .as_ref()
            .map(|s| s.items.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ColorRole>,
    #[serde(deserialize_with = "de::ratio")]
    pub ratio: f64,
}

impl ColorEntry {
    pub fn hex(&self) -> &str {
        self.hex.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn rgb(&self) -> &str {
        self.rgb.as_deref().unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorRole {
    Background,
    Text,
    Accent,
    Primary,
    Secondary,
    Unknown,
    Other(String),
}

impl ColorRole {
    pub fn as_str(&self) -> &str {
        match self {
            ColorRole::Background => "background",
            ColorRole::Text => "text",
            ColorRole::Accent => "accent",
            ColorRole::Primary => "primary",
            ColorRole::Secondary => "secondary",
            ColorRole::Unknown => UNKNOWN,
            ColorRole::Other(s) => s,
        }
    }

    pub fn is_standard(&self) -> bool {
        !matches!(self, ColorRole::Unknown | ColorRole::Other(_))
    }
}

impl From<String> for ColorRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "background" => ColorRole::Background,
            "text" => ColorRole::Text,
            "accent" => ColorRole::Accent,
            "primary" => ColorRole::Primary,
            "secondary" => ColorRole::Secondary,
            "unknown" => ColorRole::Unknown,
            _ => ColorRole::Other(s),
        }
    }
}

impl From<&str> for ColorRole {
    fn from(s: &str) -> Self {
        ColorRole::from(s.to_string())
    }
}

impl From<ColorRole> for String {
    fn from(role: ColorRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for ColorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_type: Option<LayoutType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LayoutSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutType {
    Grid,
    HorizontalScroll,
    VerticalScroll,
    SingleView,
    HeaderContentFooter,
    Columns,
    List,
    Other(String),
}

impl LayoutType {
    pub fn as_str(&self) -> &str {
        match self {
            LayoutType::Grid => "grid",
            LayoutType::HorizontalScroll => "horizontal_scroll",
            LayoutType::VerticalScroll => "vertical_scroll",
            LayoutType::SingleView => "single_view",
            LayoutType::HeaderContentFooter => "header_content_footer",
            LayoutType::Columns => "columns",
            LayoutType::List => "list",
            LayoutType::Other(s) => s,
        }
    }
}

impl From<String> for LayoutType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "grid" => LayoutType::Grid,
            "horizontal_scroll" => LayoutType::HorizontalScroll,
            "vertical_scroll" => LayoutType::VerticalScroll,
            "single_view" => LayoutType::SingleView,
            "header_content_footer" => LayoutType::HeaderContentFooter,
            "columns" => LayoutType::Columns,
            "list" => LayoutType::List,
            _ => LayoutType::Other(s),
        }
    }
}

impl From<&str> for LayoutType {
    fn from(s: &str) -> Self {
        LayoutType::from(s.to_string())
    }
}

impl From<LayoutType> for String {
    fn from(t: LayoutType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSummary {
    #[serde(deserialize_with = "de::count")]
    pub width: u32,
    #[serde(deserialize_with = "de::count")]
    pub height: u32,
    #[serde(deserialize_with = "de::count")]
    pub section_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_pattern: Option<GridPattern>,
    #[serde(deserialize_with = "de::nullable")]
    pub section_summaries: Vec<SectionSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridPattern {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "de::count")]
    pub columns: u32,
    #[serde(deserialize_with = "de::count")]
    pub rows: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSummary {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(deserialize_with = "de::count")]
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SectionSummary {
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn position(&self) -> &str {
        self.position.as_deref().unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextContent {
    #[serde(deserialize_with = "de::nullable")]
    pub text_blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    #[serde(deserialize_with = "de::nullable")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl TextBlock {
    pub fn role(&self) -> &str {
        match self.role.as_deref() {
            Some(r) if !r.is_empty() => r,
            _ => UNKNOWN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Elements {
    #[serde(deserialize_with = "de::count")]
    pub count: u32,
    #[serde(
        deserialize_with = "de::count_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<BTreeMap<String, u32>>,
    #[serde(deserialize_with = "de::nullable")]
    pub main_elements: Vec<MainElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainElement {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl MainElement {
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(deserialize_with = "de::coord")]
    pub x: i64,
    #[serde(deserialize_with = "de::coord")]
    pub y: i64,
    #[serde(deserialize_with = "de::coord")]
    pub width: i64,
    #[serde(deserialize_with = "de::coord")]
    pub height: i64,
}

impl Position {
    pub fn area(&self) -> i64 {
        self.width.max(0).saturating_mul(self.height.max(0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sections {
    #[serde(deserialize_with = "de::nullable")]
    pub items: Vec<SectionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionItem {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl SectionItem {
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(UNKNOWN)
    }
}

/// Lenient field deserializers shared with [`crate::raw`].
pub(crate) mod de {
    use super::*;
    use serde_json::Value;

    pub fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }

    fn number(v: &Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches("px").parse().ok(),
            _ => None,
        }
    }

    fn to_count(v: &Value) -> u32 {
        number(v)
            .filter(|n| n.is_finite())
            .map(|n| n.round().clamp(0.0, u32::MAX as f64) as u32)
            .unwrap_or(0)
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(to_count(&Value::deserialize(d)?))
    }

    /// Object of counts; a value that is not a number counts as 0.
    pub fn count_map<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<BTreeMap<String, u32>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), to_count(v))).collect()),
            _ => None,
        })
    }

    pub fn coord<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(number(&v)
            .filter(|n| n.is_finite())
            .map(|n| n.round() as i64)
            .unwrap_or(0))
    }

    pub fn ratio<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(number(&v).filter(|n| n.is_finite()).unwrap_or(0.0))
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(number(&v).filter(|n| n.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_and_missing_fields_degrade_to_defaults() {
        let doc = AnalysisResult::from_json_str(
            r#"{"colors":null,"layout":{"summary":{"width":"1200px","height":800.4,"sectionSummaries":null}},"elements":{"count":null}}"#,
        )
        .unwrap();
        assert!(doc.colors().is_empty());
        let summary = doc.layout_summary().unwrap();
        assert_eq!(summary.width, 1200);
        assert_eq!(summary.height, 800);
        assert!(summary.section_summaries.is_empty());
        assert_eq!(doc.element_count(), 0);
        assert!(doc.text_blocks().is_empty());
        assert!(doc.section_items().is_empty());
        assert!(doc.layout_type().is_none());
    }

    #[test]
    fn unknown_layout_types_and_roles_pass_through() {
        let doc = AnalysisResult::from_json_str(
            r#"{"layout":{"layoutType":"masonry"},"colors":[{"role":"highlight","ratio":0.1}]}"#,
        )
        .unwrap();
        assert_eq!(doc.layout_type(), Some(&LayoutType::Other("masonry".into())));
        assert_eq!(doc.colors()[0].role, Some(ColorRole::Other("highlight".into())));
        assert_eq!(doc.colors()[0].hex(), UNKNOWN);
    }
}
