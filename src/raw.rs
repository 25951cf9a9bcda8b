//! Raw analyser output, merged from one response per analysis type.

use crate::bridge::AnalysisType;
use crate::model::{Position, de};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysis {
    #[serde(deserialize_with = "de::nullable")]
    pub colors: Vec<RawColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<RawLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<RawText>,
    #[serde(deserialize_with = "de::nullable")]
    pub sections: Vec<RawSection>,
    #[serde(deserialize_with = "de::nullable")]
    pub elements: Vec<RawElement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawColor {
    pub rgb: Option<String>,
    pub hex: Option<String>,
    pub role: Option<String>,
    #[serde(deserialize_with = "de::opt_number")]
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLayout {
    pub layout_type: Option<String>,
    #[serde(deserialize_with = "de::opt_number")]
    pub width: Option<f64>,
    #[serde(deserialize_with = "de::opt_number")]
    pub height: Option<f64>,
    pub grid_pattern: Option<crate::model::GridPattern>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawText {
    #[serde(deserialize_with = "de::nullable")]
    pub text_blocks: Vec<RawTextBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTextBlock {
    pub text: Option<String>,
    pub role: Option<String>,
    #[serde(deserialize_with = "de::opt_number")]
    pub importance: Option<f64>,
    #[serde(deserialize_with = "de::opt_number")]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSection {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: Option<String>,
    #[serde(deserialize_with = "de::opt_number")]
    pub height: Option<f64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: Option<Position>,
}

impl RawAnalysis {
    /// Merges one analyser response into the slot its analysis type feeds.
    ///
    /// Responses may wrap the payload under the slot name or return it bare.
    /// A payload that does not fit the slot is logged and ignored.
    pub fn absorb(&mut self, kind: AnalysisType, value: Value) {
        let result = match kind {
            AnalysisType::ExtractColors => {
                parse_slot::<Vec<RawColor>>(value, "colors").map(|v| self.colors = v)
            }
            AnalysisType::ExtractText => parse_text(value).map(|v| self.text = Some(v)),
            AnalysisType::AnalyzeLayout => {
                parse_slot::<RawLayout>(value, "layout").map(|v| self.layout = Some(v))
            }
            AnalysisType::AnalyzeSections | AnalysisType::DetectSections => {
                parse_slot::<Vec<RawSection>>(value, "sections").map(|v| {
                    if self.sections.is_empty() {
                        self.sections = v;
                    } else {
                        debug!("sections already populated; keeping first response");
                    }
                })
            }
            AnalysisType::DetectCards | AnalysisType::DetectFeatures => {
                parse_slot::<Vec<RawElement>>(value, "elements").map(|v| self.elements.extend(v))
            }
        };
        if let Err(err) = result {
            warn!("ignoring {kind} response with unexpected shape: {err}");
        }
    }
}

fn parse_slot<T: for<'de> Deserialize<'de>>(value: Value, key: &str) -> serde_json::Result<T> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(inner)
}

// extract_text answers with either {"textBlocks": [...]}, {"text": {"textBlocks": [...]}}
// or a bare block list.
fn parse_text(value: Value) -> serde_json::Result<RawText> {
    match value {
        Value::Array(_) => Ok(RawText {
            text_blocks: serde_json::from_value(value)?,
        }),
        Value::Object(mut map) => match map.remove("text") {
            Some(inner @ Value::Object(_)) => serde_json::from_value(inner),
            _ => serde_json::from_value(Value::Object(map)),
        },
        other => serde_json::from_value(other),
    }
}
