use crate::{
    config::Compress,
    model::{
        AnalysisResult, ColorEntry, ColorRole, Elements, Layout, LayoutSummary, LayoutType,
        MainElement, SectionItem, SectionSummary, Sections, TextBlock, TextContent, UNKNOWN,
    },
    prompt::color::is_light,
    raw::{RawAnalysis, RawColor, RawTextBlock},
};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// Reduces a raw analysis to the bounded document consumed by the prompt builder.
pub fn compress(cfg: &Compress, raw: &RawAnalysis) -> AnalysisResult {
    let colors = compress_colors(cfg, &raw.colors);
    let layout = compress_layout(cfg, raw);
    let text = compress_text(cfg, raw);
    let elements = compress_elements(cfg, raw);
    let sections = Sections {
        items: raw
            .sections
            .iter()
            .map(|s| SectionItem {
                kind: Some(s.kind.clone().unwrap_or_else(|| UNKNOWN.to_string())),
            })
            .collect(),
    };

    debug!(
        colors = colors.len(),
        text_blocks = text.text_blocks.len(),
        elements = elements.count,
        sections = sections.items.len(),
        "compressed analysis"
    );

    AnalysisResult {
        colors,
        layout: Some(layout),
        text: Some(text),
        elements: Some(elements),
        sections: Some(sections),
    }
}

fn compress_colors(cfg: &Compress, raw: &[RawColor]) -> Vec<ColorEntry> {
    let mut out: Vec<ColorEntry> = Vec::with_capacity(raw.len());
    for c in raw {
        if c.rgb.is_none() && c.hex.is_none() {
            continue;
        }
        let ratio = c.ratio.unwrap_or(0.0);
        let role = match c.role.as_deref().map(ColorRole::from) {
            Some(r) if r.is_standard() => r,
            _ => infer_color_role(ratio, c.rgb.as_deref(), &out),
        };
        out.push(ColorEntry {
            hex: c.hex.clone(),
            rgb: c.rgb.clone(),
            role: Some(role),
            ratio,
        });
    }

    // Stable: equal ratios keep analyser order.
    out.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    out.truncate(cfg.max_colors);

    if out.len() < 2 {
        if raw.is_empty() {
            warn!("no color information; using default palette");
        }
        if !out.iter().any(|c| c.role == Some(ColorRole::Background)) {
            out.push(default_color("#ffffff", "rgb(255,255,255)", ColorRole::Background, 0.8));
        }
        if !out.iter().any(|c| c.role == Some(ColorRole::Text)) {
            out.push(default_color("#000000", "rgb(0,0,0)", ColorRole::Text, 0.2));
        }
    }
    out
}

fn infer_color_role(ratio: f64, rgb: Option<&str>, seen: &[ColorEntry]) -> ColorRole {
    let used = |role: ColorRole| seen.iter().any(|c| c.role.as_ref() == Some(&role));
    if ratio > 0.3 {
        return ColorRole::Background;
    }
    if !is_light(rgb) && !used(ColorRole::Text) {
        return ColorRole::Text;
    }
    if !used(ColorRole::Primary) {
        ColorRole::Primary
    } else if !used(ColorRole::Secondary) {
        ColorRole::Secondary
    } else {
        ColorRole::Accent
    }
}

fn default_color(hex: &str, rgb: &str, role: ColorRole, ratio: f64) -> ColorEntry {
    ColorEntry {
        hex: Some(hex.to_string()),
        rgb: Some(rgb.to_string()),
        role: Some(role),
        ratio,
    }
}

fn compress_layout(cfg: &Compress, raw: &RawAnalysis) -> Layout {
    let raw_layout = raw.layout.clone().unwrap_or_default();
    let dim = |v: Option<f64>, default: u32| {
        v.filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n.round() as u32)
            .unwrap_or(default)
    };

    let section_summaries = raw
        .sections
        .iter()
        .take(cfg.max_sections)
        .map(|s| SectionSummary {
            kind: Some(s.kind.clone().unwrap_or_else(|| "content".to_string())),
            position: Some(s.position.clone().unwrap_or_else(|| "middle".to_string())),
            height: s.height.map(|h| h.max(0.0).round() as u32).unwrap_or(0),
            color: s.color.clone(),
        })
        .collect();

    Layout {
        layout_type: Some(LayoutType::from(
            raw_layout
                .layout_type
                .unwrap_or_else(|| "other".to_string()),
        )),
        summary: Some(LayoutSummary {
            width: dim(raw_layout.width, cfg.default_width),
            height: dim(raw_layout.height, cfg.default_height),
            section_count: u32::try_from(raw.sections.len()).unwrap_or(u32::MAX),
            grid_pattern: raw_layout.grid_pattern,
            section_summaries,
        }),
    }
}

fn compress_text(cfg: &Compress, raw: &RawAnalysis) -> TextContent {
    let blocks = raw
        .text
        .as_ref()
        .map(|t| t.text_blocks.as_slice())
        .unwrap_or_default();

    let text_blocks = blocks
        .iter()
        .filter_map(|b| {
            let text = clean_text(cfg, b.text.as_deref().unwrap_or(""));
            if text.is_empty() {
                return None;
            }
            let role = match b.role.as_deref() {
                Some(r) if !r.trim().is_empty() => r.trim().to_string(),
                _ => infer_text_role(b).to_string(),
            };
            Some(TextBlock {
                text,
                role: Some(role),
            })
        })
        .take(cfg.max_text_blocks)
        .collect();

    TextContent { text_blocks }
}

fn clean_text(cfg: &Compress, s: &str) -> String {
    let normalized: String = if cfg.normalize_unicode {
        s.nfkc().collect()
    } else {
        s.to_string()
    };
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn infer_text_role(block: &RawTextBlock) -> &'static str {
    let importance = block.importance.unwrap_or(0.0);
    let font_size = block.font_size.unwrap_or(0.0);
    if importance > 0.8 || font_size > 24.0 {
        "heading"
    } else if importance > 0.5 || font_size > 18.0 {
        "subheading"
    } else {
        "body"
    }
}

fn compress_elements(cfg: &Compress, raw: &RawAnalysis) -> Elements {
    let mut summary: BTreeMap<String, u32> = BTreeMap::new();
    for e in &raw.elements {
        let kind = e
            .kind
            .as_deref()
            .map(|k| k.trim().to_ascii_lowercase())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        *summary.entry(kind).or_insert(0) += 1;
    }

    let mut ranked: Vec<&crate::raw::RawElement> = raw.elements.iter().collect();
    ranked.sort_by_key(|e| std::cmp::Reverse(e.position.map(|p| p.area()).unwrap_or(0)));
    let main_elements = ranked
        .into_iter()
        .take(cfg.max_main_elements)
        .map(|e| MainElement {
            kind: e.kind.clone(),
            position: e.position,
        })
        .collect();

    Elements {
        count: u32::try_from(raw.elements.len()).unwrap_or(u32::MAX),
        summary: Some(summary),
        main_elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawTextBlock;

    #[test]
    fn text_role_follows_size_and_importance() {
        let block = |importance, font_size| RawTextBlock {
            text: Some("x".into()),
            role: None,
            importance,
            font_size,
        };
        assert_eq!(infer_text_role(&block(Some(0.9), None)), "heading");
        assert_eq!(infer_text_role(&block(None, Some(20.0))), "subheading");
        assert_eq!(infer_text_role(&block(None, None)), "body");
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        let cfg = Compress::default();
        assert_eq!(clean_text(&cfg, "  Ｈello \n  world "), "Hello world");
    }
}
