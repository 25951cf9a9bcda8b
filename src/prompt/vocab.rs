//! Fixed vocabulary tables. Lookups never fail: unknown keys pass through.

use super::text::capitalize;
use crate::model::{ColorRole, LayoutType};

pub fn layout_type_description(t: &LayoutType) -> &str {
    match t {
        LayoutType::Grid => "grid-based",
        LayoutType::HorizontalScroll => "horizontally scrollable",
        LayoutType::VerticalScroll => "vertically scrollable",
        LayoutType::SingleView => "single-view",
        LayoutType::HeaderContentFooter => "traditional header-content-footer",
        LayoutType::Columns => "multi-column",
        LayoutType::List => "list-based",
        LayoutType::Other(s) => s,
    }
}

/// `None` for roles outside the table; callers render the bare role.
pub fn color_role_description(role: &ColorRole) -> Option<&'static str> {
    match role {
        ColorRole::Background => Some("background color"),
        ColorRole::Text => Some("text color"),
        ColorRole::Accent => Some("accent color"),
        ColorRole::Primary => Some("primary brand color"),
        ColorRole::Secondary => Some("secondary color"),
        ColorRole::Unknown | ColorRole::Other(_) => None,
    }
}

const SECTION_LABELS: &[(&str, &str)] = &[
    ("hero", "Hero section"),
    ("header", "Header section"),
    ("footer", "Footer section"),
    ("nav", "Navigation section"),
    ("card-grid", "Card grid section"),
    ("features", "Features section"),
    ("about", "About section"),
    ("contact", "Contact form section"),
    ("testimonials", "Testimonials section"),
    ("pricing", "Pricing section"),
    ("gallery", "Gallery section"),
    ("cta", "Call-to-action section"),
    ("faq", "FAQ section"),
    ("content", "Content section"),
];

pub fn section_label(kind: &str) -> String {
    SECTION_LABELS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| format!("{} section", capitalize(kind)))
}

pub fn attention_flow(t: Option<&LayoutType>) -> &'static str {
    match t {
        Some(LayoutType::VerticalScroll) => "from top to bottom",
        Some(LayoutType::HorizontalScroll) => "from left to right",
        Some(LayoutType::Grid) => "across different grid areas",
        Some(LayoutType::HeaderContentFooter) => {
            "from the header through the main content to the footer"
        }
        _ => "naturally",
    }
}
