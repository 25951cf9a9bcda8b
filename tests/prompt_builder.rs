use design_prompt::{
    model::AnalysisResult,
    prompt::{
        MISSING_DATA_PROMPT, analyze_intent, build_prompt, infer_intent, section_body,
        sections::{self, NO_COLORS, NO_ELEMENTS, NO_LAYOUT, NO_TEXT},
    },
};
use serde_json::json;

fn doc(value: serde_json::Value) -> AnalysisResult {
    serde_json::from_value(value).expect("document")
}

fn landing_page() -> AnalysisResult {
    doc(json!({
        "colors": [
            { "hex": "#ffffff", "rgb": "rgb(255, 255, 255)", "role": "background", "ratio": 0.625 },
            { "hex": "#1a1a1a", "rgb": "rgb(26,26,26)", "role": "text", "ratio": 0.2 },
            { "hex": "#ff5722", "rgb": "rgb(255,87,34)", "role": "accent", "ratio": 0.05 }
        ],
        "layout": {
            "layoutType": "grid",
            "summary": {
                "width": 1440,
                "height": 900,
                "sectionCount": 3,
                "gridPattern": { "type": "grid", "columns": 3, "rows": 2 },
                "sectionSummaries": [
                    { "type": "hero", "position": "top", "height": 400, "color": "#ffffff" },
                    { "type": "cta", "position": "bottom", "height": 200 }
                ]
            }
        },
        "text": {
            "textBlocks": [
                { "text": "Build faster", "role": "heading" },
                { "text": "Ship your product in days", "role": "body" },
                { "text": "Pricing", "role": "heading" },
                { "text": "Features", "role": "heading" },
                { "text": "Contact", "role": "heading" }
            ]
        },
        "elements": {
            "count": 4,
            "summary": { "button": 2, "image": 1, "card": 1 },
            "mainElements": [
                { "type": "button", "position": { "x": 10, "y": 20, "width": 120, "height": 40 } },
                { "type": "image" }
            ]
        },
        "sections": { "items": [ { "type": "hero" }, { "type": "cta" }, { "type": "footer" } ] }
    }))
}

#[test]
fn missing_document_yields_fallback_string() {
    assert_eq!(build_prompt(None), MISSING_DATA_PROMPT);
}

#[test]
fn sections_appear_in_fixed_order() {
    let prompt = build_prompt(Some(&landing_page()));
    let headers = [
        "# UI Design Analysis and Code Generation Task",
        "## Color Palette",
        "## Layout Structure",
        "## Text Content",
        "## UI Elements",
        "## Design Intent",
        "### Instructions:",
    ];
    let positions: Vec<usize> = headers
        .iter()
        .map(|h| prompt.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn end_to_end_landing_page() {
    let prompt = build_prompt(Some(&landing_page()));
    assert!(prompt.contains("This design appears to be a grid-based layout with dimensions of 1440x900px."));
    assert!(prompt.contains("The layout follows a grid grid pattern with 3 columns and 2 rows."));
    assert!(prompt.contains("The design contains approximately 4 UI elements."));

    let intent = section_body(&prompt, "Design Intent").expect("intent section");
    assert!(intent.contains("landing page website"));
    assert!(intent.contains("focused on call-to-action"));
    assert!(intent.contains("clean, minimalist aesthetic"));
    assert!(intent.contains("across different grid areas"));

    let layout = section_body(&prompt, "Layout Structure").expect("layout section");
    assert!(layout.contains("You should implement this using CSS Grid."));
    assert!(layout.contains("- Hero section (top position, height: 400px), color: #ffffff"));
    assert!(layout.contains("- Call-to-action section (bottom position, height: 200px)"));
}

#[test]
fn minimal_hero_and_cta_page_is_a_landing_page() {
    let d = doc(json!({
        "colors": [
            { "hex": "#FFFFFF", "rgb": "rgb(255,255,255)", "role": "background", "ratio": 0.6 }
        ],
        "layout": {
            "layoutType": "grid",
            "summary": {
                "width": 1200,
                "height": 800,
                "sectionCount": 3,
                "gridPattern": { "type": "grid", "columns": 3, "rows": 1 }
            }
        },
        "sections": { "items": [ { "type": "hero" }, { "type": "cta" } ] },
        "elements": { "summary": { "button": 2 }, "count": 2 }
    }));
    let prompt = build_prompt(Some(&d));

    let intent = section_body(&prompt, "Design Intent").expect("intent section");
    assert!(intent.contains("landing page website"));
    assert!(intent.contains("focused on call-to-action"));
    assert!(intent.contains("clean, minimalist aesthetic"));

    let layout = section_body(&prompt, "Layout Structure").expect("layout section");
    assert!(layout.contains("CSS Grid"));
}

#[test]
fn color_lines_match_entries_and_round_half_away_from_zero() {
    let d = landing_page();
    let body = sections::colors(d.colors());
    let lines: Vec<&str> = body.lines().filter(|l| l.starts_with("- ")).collect();
    assert_eq!(lines.len(), d.colors().len());
    assert_eq!(
        lines[0],
        "- #ffffff (rgb(255, 255, 255)): background (background color), 63% of design"
    );
    assert_eq!(lines[1], "- #1a1a1a (rgb(26,26,26)): text (text color), 20% of design");
    assert_eq!(lines[2], "- #ff5722 (rgb(255,87,34)): accent (accent color), 5% of design");
}

#[test]
fn color_order_is_preserved_not_sorted() {
    let d = doc(json!({
        "colors": [
            { "hex": "#000001", "ratio": 0.1 },
            { "hex": "#000002", "ratio": 0.9 }
        ]
    }));
    let body = sections::colors(d.colors());
    let first = body.find("#000001").expect("first");
    let second = body.find("#000002").expect("second");
    assert!(first < second);
    assert!(body.contains("- #000001 (unknown): general use, 10% of design"));
}

#[test]
fn unknown_roles_pass_through() {
    let d = doc(json!({ "colors": [ { "hex": "#123456", "rgb": "rgb(18,52,86)", "role": "highlight", "ratio": 0.5 } ] }));
    assert!(sections::colors(d.colors()).contains(": highlight, 50% of design"));
}

#[test]
fn empty_colors_use_fixed_sentence_and_default_to_light() {
    let d = doc(json!({ "colors": [] }));
    let prompt = build_prompt(Some(&d));
    assert_eq!(section_body(&prompt, "Color Palette"), Some(NO_COLORS));
    assert!(analyze_intent(&d).style == "clean, minimalist");
}

#[test]
fn luminance_boundary_is_inclusive() {
    let with_first = |rgb: &str| doc(json!({ "colors": [ { "rgb": rgb, "ratio": 1.0 } ] }));
    assert_eq!(analyze_intent(&with_first("rgb(128,128,128)")).style, "clean, minimalist");
    assert_eq!(analyze_intent(&with_first("rgb(127,127,127)")).style, "bold, contrasting");
    assert_eq!(analyze_intent(&with_first("not a color")).style, "clean, minimalist");
}

#[test]
fn only_first_color_decides_style() {
    let d = doc(json!({
        "colors": [
            { "rgb": "rgb(0,0,0)", "ratio": 0.1 },
            { "rgb": "rgb(255,255,255)", "ratio": 0.9 }
        ]
    }));
    assert_eq!(analyze_intent(&d).style, "bold, contrasting");
}

#[test]
fn e_commerce_wins_over_portfolio() {
    let d = doc(json!({ "sections": { "items": [ { "type": "gallery" }, { "type": "pricing" } ] } }));
    assert_eq!(analyze_intent(&d).website_type, "e-commerce");

    let d = doc(json!({ "sections": { "items": [ { "type": "gallery" } ] } }));
    assert_eq!(analyze_intent(&d).website_type, "portfolio");
}

#[test]
fn intent_reads_section_items_not_layout_summaries() {
    let d = doc(json!({
        "layout": { "summary": { "sectionSummaries": [ { "type": "pricing" } ] } },
        "sections": { "items": [ { "type": "about" } ] }
    }));
    assert_eq!(analyze_intent(&d).website_type, "corporate");
}

#[test]
fn highlight_sentences_follow_fixed_order_and_flags() {
    let d = doc(json!({
        "sections": { "items": [ { "type": "contact" }, { "type": "hero" }, { "type": "testimonials" } ] }
    }));
    let text = infer_intent(&d);
    let hero = text.find("The hero section").expect("hero");
    let testimonials = text.find("Testimonials are used").expect("testimonials");
    let contact = text.find("The contact section").expect("contact");
    assert!(hero < testimonials && testimonials < contact);
    assert!(!text.contains("The features section"));
    assert!(!text.contains("Call-to-action elements"));
}

#[test]
fn text_examples_truncate_at_fifty_characters() {
    let fifty = "a".repeat(50);
    let fifty_one = "b".repeat(51);
    let d = doc(json!({
        "text": { "textBlocks": [
            { "text": fifty.clone(), "role": "body" },
            { "text": fifty_one.clone(), "role": "body" }
        ] }
    }));
    let body = sections::text(d.text_blocks());
    assert!(body.contains(&format!("\"{fifty}\"")));
    assert!(body.contains(&format!("\"{}...\"", "b".repeat(50))));
    assert!(!body.contains(&"b".repeat(51)));
}

#[test]
fn text_groups_cap_examples_and_count_the_rest() {
    let prompt = build_prompt(Some(&landing_page()));
    let body = section_body(&prompt, "Text Content").expect("text section");
    assert!(body.contains(
        "- Heading: \"Build faster\", \"Pricing\", \"Features\" (+1 more)"
    ));
    assert!(body.contains("- Body: \"Ship your product in days\""));
    assert!(body.find("- Heading").expect("heading") < body.find("- Body").expect("body"));
}

#[test]
fn elements_render_counts_and_default_positions() {
    let d = landing_page();
    let body = sections::elements(&d);
    assert!(body.contains("The design contains 4 UI elements, including 2 buttons, 1 card, 1 image."));
    assert!(body.contains("- button: positioned at x:10, y:20, size 120x40px"));
    assert!(body.contains("- image: positioned at x:0, y:0, size 0x0px"));
}

#[test]
fn missing_sub_documents_use_fixed_sentences() {
    let d = AnalysisResult::default();
    let prompt = build_prompt(Some(&d));
    assert_eq!(section_body(&prompt, "Layout Structure"), Some(NO_LAYOUT));
    assert_eq!(section_body(&prompt, "Text Content"), Some(NO_TEXT));
    assert_eq!(section_body(&prompt, "UI Elements"), Some(NO_ELEMENTS));
    assert!(prompt.contains("This design appears to be an unknown layout with dimensions of unknownxunknownpx."));
    assert!(prompt.contains("The design is organized into 0 main sections."));
    assert!(prompt.contains("information presentation"));
    assert!(prompt.contains("business website"));
}

#[test]
fn prompt_is_deterministic() {
    let d = landing_page();
    assert_eq!(build_prompt(Some(&d)), build_prompt(Some(&d)));
}

#[test]
fn null_fields_degrade_to_defaults() {
    let d = AnalysisResult::from_json_str(
        r#"{"colors": null, "layout": {"summary": {"width": "800px", "height": null}}, "elements": {"summary": null}}"#,
    )
    .expect("lenient parse");
    assert!(d.colors().is_empty());
    assert_eq!(d.layout_summary().map(|s| (s.width, s.height)), Some((800, 0)));
    assert_eq!(sections::elements(&d), NO_ELEMENTS);
}

#[test]
fn float_and_null_element_counts_are_tolerated() {
    let d = AnalysisResult::from_json_str(
        r#"{"elements": {"count": 3.0, "summary": {"button": 2.0, "image": null, "card": "1"}}}"#,
    )
    .expect("lenient parse");
    let summary = d.element_summary().expect("summary");
    assert_eq!(summary.get("button"), Some(&2));
    assert_eq!(summary.get("image"), Some(&0));
    assert_eq!(summary.get("card"), Some(&1));
    assert!(sections::elements(&d).starts_with("The design contains 3 UI elements, including 2 buttons"));
}

#[test]
fn zero_dimensions_render_as_unknown_in_layout() {
    let d = doc(json!({ "layout": { "summary": { "width": 0, "height": 640 } } }));
    let layout = sections::layout(d.layout.as_ref());
    assert!(layout.contains("width of unknownpx and height of 640px"));
    assert!(sections::overview(&d).contains("dimensions of unknownx640px"));
}
