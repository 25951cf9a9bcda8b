//! Deterministic prompt construction from a compressed analysis document.
//!
//! [`build_prompt`] concatenates the section builders in a fixed order:
//! overview, colors, layout, text, elements, design intent, instructions.
//! Every builder is pure; identical documents produce identical prompts.

pub mod color;
pub mod intent;
pub mod rules;
pub mod sections;
pub mod text;
pub mod vocab;

pub use intent::{Intent, analyze_intent, infer_intent};

use crate::model::AnalysisResult;

pub const MISSING_DATA_PROMPT: &str =
    "Image analysis data is not available. Please re-upload the image.";

pub fn build_prompt(doc: Option<&AnalysisResult>) -> String {
    let Some(doc) = doc else {
        return MISSING_DATA_PROMPT.to_string();
    };

    format!(
        "# UI Design Analysis and Code Generation Task\n\n\
         {overview}\n\n\
         ## Color Palette\n{colors}\n\n\
         ## Layout Structure\n{layout}\n\n\
         ## Text Content\n{text}\n\n\
         ## UI Elements\n{elements}\n\n\
         ## Design Intent\n{intent}\n\n\
         ### Instructions:\n\n{instructions}\n\n\
         Please generate the HTML and SCSS code that accurately reproduces this design.\n\
         Provide the code in two separate code blocks labeled \"HTML\" and \"SCSS\".\n",
        overview = sections::overview(doc),
        colors = sections::colors(doc.colors()),
        layout = sections::layout(doc.layout.as_ref()),
        text = sections::text(doc.text_blocks()),
        elements = sections::elements(doc),
        intent = infer_intent(doc),
        instructions = sections::instructions(),
    )
}

/// Extracts the body of a `## <title>` section from a built prompt.
pub fn section_body<'a>(prompt: &'a str, title: &str) -> Option<&'a str> {
    let header = format!("## {title}\n");
    let start = prompt.find(&header)? + header.len();
    let rest = &prompt[start..];
    let end = rest.find("\n## ").or_else(|| rest.find("\n### ")).unwrap_or(rest.len());
    Some(rest[..end].trim_end())
}
