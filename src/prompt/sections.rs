//! Prompt sub-builders. Each renders one section body from the document and
//! substitutes a fixed sentence when its data is missing.

use super::{
    rules::{Rule, RuleTable},
    text::{capitalize, indefinite_article, percent, pluralize, truncate},
    vocab::{color_role_description, layout_type_description, section_label},
};
use crate::model::{AnalysisResult, ColorEntry, GridPattern, Layout, TextBlock, UNKNOWN};
use std::fmt::Write;

pub const NO_COLORS: &str = "No color information is available.";
pub const NO_LAYOUT: &str = "No layout information is available.";
pub const NO_TEXT: &str = "No text content is available.";
pub const NO_ELEMENTS: &str = "No UI element information is available.";

/// Examples shown per text role.
pub const TEXT_EXAMPLES_PER_ROLE: usize = 3;
pub const TEXT_EXAMPLE_MAX_CHARS: usize = 50;

pub const INSTRUCTIONS: &str = "\
Generate clean, semantic HTML and SCSS code that accurately reproduces this design.
Follow these guidelines:
1. Use semantic HTML5 elements where appropriate (header, nav, main, section, article, footer)
2. Implement BEM naming convention for CSS classes
3. Create responsive design with mobile-first approach
4. Ensure accessibility (WCAG compliance)
5. Optimize for performance with clean, minimal CSS
6. Use CSS variables for the color palette
7. Create a component-based structure that could be easily maintained";

pub static CSS_METHOD: RuleTable<GridPattern> = RuleTable {
    rules: &[
        Rule {
            name: "multi_column_grid",
            when: |g| g.kind.as_deref() == Some("grid") && g.columns > 1,
            outcome: "CSS Grid",
        },
        Rule {
            name: "horizontal_or_columns",
            when: |g| matches!(g.kind.as_deref(), Some("horizontal" | "columns")),
            outcome: "Flexbox",
        },
        Rule {
            name: "header_content_footer",
            when: |g| g.kind.as_deref() == Some("header_content_footer"),
            outcome: "a combination of CSS Grid for the overall layout and Flexbox for the components inside each area",
        },
    ],
    default: "appropriate CSS layout techniques",
};

fn dimension(v: u32) -> String {
    if v == 0 {
        UNKNOWN.to_string()
    } else {
        v.to_string()
    }
}

pub fn overview(doc: &AnalysisResult) -> String {
    let layout_desc = doc
        .layout_type()
        .map(layout_type_description)
        .unwrap_or(UNKNOWN);
    let summary = doc.layout_summary().cloned().unwrap_or_default();

    let mut out = format!(
        "This design appears to be {} {} layout with dimensions of {}x{}px.\n\
         The design is organized into {} main sections.",
        indefinite_article(layout_desc),
        layout_desc,
        dimension(summary.width),
        dimension(summary.height),
        summary.section_count,
    );

    if let Some(grid) = summary.grid_pattern.as_ref() {
        if let Some(kind) = grid.kind.as_deref() {
            let _ = write!(
                out,
                "\nThe layout follows a {kind} grid pattern with {} columns and {} rows.",
                grid.columns, grid.rows
            );
        }
    }

    let count = doc.element_count();
    if count > 0 {
        let _ = write!(
            out,
            "\nThe design contains approximately {count} UI elements."
        );
    }
    out
}

pub fn colors(colors: &[ColorEntry]) -> String {
    if colors.is_empty() {
        return NO_COLORS.to_string();
    }

    let lines = colors.iter().map(color_line).collect::<Vec<_>>().join("\n");
    format!(
        "The design uses the following color palette:\n\n{lines}\n\n\
         These colors should be defined as SCSS variables for consistency throughout the code."
    )
}

pub fn color_line(color: &ColorEntry) -> String {
    let role = match color.role.as_ref() {
        Some(role) => match color_role_description(role) {
            Some(desc) => format!("{role} ({desc})"),
            None => role.to_string(),
        },
        None => "general use".to_string(),
    };
    format!(
        "- {} ({}): {}, {}% of design",
        color.hex(),
        color.rgb(),
        role,
        percent(color.ratio)
    )
}

pub fn layout(layout: Option<&Layout>) -> String {
    let Some(summary) = layout.and_then(|l| l.summary.as_ref()) else {
        return NO_LAYOUT.to_string();
    };

    let mut out = format!(
        "The design has an overall width of {}px and height of {}px.",
        dimension(summary.width),
        dimension(summary.height)
    );

    if let Some(grid) = summary.grid_pattern.as_ref() {
        if let Some(kind) = grid.kind.as_deref() {
            let _ = write!(
                out,
                "\nThe layout is arranged in a {kind} pattern with {} columns and {} rows.\n\
                 You should implement this using {}.",
                grid.columns,
                grid.rows,
                CSS_METHOD.evaluate(grid)
            );
        }
    }

    out.push_str("\n\nThe layout consists of the following sections:\n");
    if summary.section_summaries.is_empty() {
        out.push_str("No distinct sections detected.");
    } else {
        let bullets = summary
            .section_summaries
            .iter()
            .map(|s| {
                let mut line = format!(
                    "- {} ({} position, height: {}px)",
                    section_label(s.kind()),
                    s.position(),
                    s.height
                );
                if let Some(color) = s.color.as_deref() {
                    let _ = write!(line, ", color: {color}");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&bullets);
    }
    out
}

/// Groups blocks by role in order of first appearance.
pub fn group_by_role(blocks: &[TextBlock]) -> Vec<(&str, Vec<&TextBlock>)> {
    let mut groups: Vec<(&str, Vec<&TextBlock>)> = Vec::new();
    for block in blocks {
        let role = block.role();
        match groups.iter_mut().find(|(r, _)| *r == role) {
            Some((_, members)) => members.push(block),
            None => groups.push((role, vec![block])),
        }
    }
    groups
}

pub fn text(blocks: &[TextBlock]) -> String {
    if blocks.is_empty() {
        return NO_TEXT.to_string();
    }

    let mut lines = String::new();
    for (role, members) in group_by_role(blocks) {
        let examples = members
            .iter()
            .take(TEXT_EXAMPLES_PER_ROLE)
            .map(|b| format!("\"{}\"", truncate(&b.text, TEXT_EXAMPLE_MAX_CHARS)))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(lines, "- {}: {examples}", capitalize(role));
        if members.len() > TEXT_EXAMPLES_PER_ROLE {
            let _ = write!(lines, " (+{} more)", members.len() - TEXT_EXAMPLES_PER_ROLE);
        }
        lines.push('\n');
    }

    format!(
        "The design contains the following text elements:\n\n{lines}\n\
         Ensure proper text hierarchy and typography in your implementation."
    )
}

pub fn elements(doc: &AnalysisResult) -> String {
    let Some(summary) = doc.element_summary().filter(|m| !m.is_empty()) else {
        return NO_ELEMENTS.to_string();
    };

    let types = summary
        .iter()
        .map(|(kind, count)| format!("{count} {}", pluralize(kind, *count)))
        .collect::<Vec<_>>()
        .join(", ");

    let main = doc.main_elements();
    let key_elements = if main.is_empty() {
        "No specific key elements were identified.".to_string()
    } else {
        main.iter()
            .map(|e| {
                let p = e.position.unwrap_or_default();
                format!(
                    "- {}: positioned at x:{}, y:{}, size {}x{}px",
                    e.kind(),
                    p.x,
                    p.y,
                    p.width,
                    p.height
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "The design contains {} UI elements, including {types}.\n\nKey elements:\n{key_elements}",
        doc.element_count()
    )
}

pub fn instructions() -> &'static str {
    INSTRUCTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(kind: &str, columns: u32) -> GridPattern {
        GridPattern {
            kind: Some(kind.into()),
            columns,
            rows: 1,
        }
    }

    #[test]
    fn css_method_table() {
        assert_eq!(CSS_METHOD.evaluate(&grid("grid", 3)), "CSS Grid");
        assert_eq!(
            CSS_METHOD.evaluate(&grid("grid", 1)),
            "appropriate CSS layout techniques"
        );
        assert_eq!(CSS_METHOD.evaluate(&grid("columns", 1)), "Flexbox");
        assert_eq!(CSS_METHOD.evaluate(&grid("horizontal", 4)), "Flexbox");
        assert!(CSS_METHOD
            .evaluate(&grid("header_content_footer", 1))
            .starts_with("a combination of CSS Grid"));
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let block = |role: &str| TextBlock {
            text: "t".into(),
            role: Some(role.into()),
        };
        let blocks = vec![block("body"), block("heading"), block("body")];
        let groups = group_by_role(&blocks);
        assert_eq!(groups[0].0, "body");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "heading");
    }
}
