//! Rule-based design-intent inference.
//!
//! Everything here is derived from counts in the compressed document:
//! section types come from `sections.items` only, element presence from
//! `elements.summary`, and the background tone from the first color.

use super::{
    color::is_light,
    rules::{Rule, RuleTable},
    text::indefinite_article,
    vocab::attention_flow,
};
use crate::model::AnalysisResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Structural signals the decision tables read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signals {
    pub light_background: bool,
    pub section_types: BTreeMap<String, u32>,
    pub element_types: BTreeMap<String, u32>,
}

impl Signals {
    pub fn from_document(doc: &AnalysisResult) -> Self {
        let light_background = is_light(doc.colors().first().and_then(|c| c.rgb.as_deref()));

        let mut section_types = BTreeMap::new();
        for item in doc.section_items() {
            *section_types.entry(item.kind().to_string()).or_insert(0) += 1;
        }

        Self {
            light_background,
            section_types,
            element_types: doc.element_summary().cloned().unwrap_or_default(),
        }
    }

    pub fn section(&self, kind: &str) -> bool {
        self.section_types.get(kind).is_some_and(|n| *n > 0)
    }

    pub fn element(&self, kind: &str) -> bool {
        self.element_types.get(kind).is_some_and(|n| *n > 0)
    }

    pub fn distinct_section_types(&self) -> usize {
        self.section_types.len()
    }

    pub fn has_hero(&self) -> bool {
        self.section("hero")
    }
    pub fn has_features(&self) -> bool {
        self.section("features")
    }
    pub fn has_testimonials(&self) -> bool {
        self.section("testimonials")
    }
    pub fn has_pricing(&self) -> bool {
        self.section("pricing")
    }
    pub fn has_contact(&self) -> bool {
        self.section("contact")
    }
    pub fn has_cta(&self) -> bool {
        self.section("cta")
    }
    pub fn has_buttons(&self) -> bool {
        self.element("button")
    }
    pub fn has_inputs(&self) -> bool {
        self.element("text_input")
    }
    pub fn has_cards(&self) -> bool {
        self.element("card")
    }
}

pub static PURPOSE: RuleTable<Signals> = RuleTable {
    rules: &[
        Rule {
            name: "contact_or_inputs",
            when: |s| s.has_contact() || s.has_inputs(),
            outcome: "user input collection",
        },
        Rule {
            name: "cta_or_buttons",
            when: |s| s.has_cta() || (s.has_buttons() && !s.has_inputs()),
            outcome: "call-to-action",
        },
        Rule {
            name: "pricing_or_features",
            when: |s| s.has_pricing() || s.has_features(),
            outcome: "product or service presentation",
        },
        Rule {
            name: "testimonials",
            when: |s| s.has_testimonials(),
            outcome: "building trust and credibility",
        },
        Rule {
            name: "cards",
            when: |s| s.has_cards(),
            outcome: "content discovery",
        },
    ],
    default: "information presentation",
};

pub static WEBSITE_TYPE: RuleTable<Signals> = RuleTable {
    rules: &[
        Rule {
            name: "pricing_or_product_card",
            when: |s| s.has_pricing() || s.element("product_card"),
            outcome: "e-commerce",
        },
        Rule {
            name: "gallery_or_portfolio",
            when: |s| s.section("gallery") || s.section("portfolio"),
            outcome: "portfolio",
        },
        Rule {
            name: "hero_cta_compact",
            when: |s| s.has_hero() && s.has_cta() && s.distinct_section_types() < 5,
            outcome: "landing page",
        },
        Rule {
            name: "about_or_team",
            when: |s| s.section("about") || s.section("team"),
            outcome: "corporate",
        },
        Rule {
            name: "article_or_blog",
            when: |s| s.element("article") || s.section("blog"),
            outcome: "blog",
        },
        Rule {
            name: "features_and_pricing",
            when: |s| s.has_features() && s.has_pricing(),
            outcome: "SaaS",
        },
    ],
    default: "business",
};

pub static STYLE: RuleTable<Signals> = RuleTable {
    rules: &[Rule {
        name: "light_background",
        when: |s| s.light_background,
        outcome: "clean, minimalist",
    }],
    default: "bold, contrasting",
};

// Fixed order: hero, features, testimonials, cta, contact.
const HIGHLIGHTS: &[(fn(&Signals) -> bool, &str)] = &[
    (
        Signals::has_hero,
        "The hero section at the top establishes the main value proposition.",
    ),
    (
        Signals::has_features,
        "The features section highlights key benefits or services.",
    ),
    (
        Signals::has_testimonials,
        "Testimonials are used to build credibility and trust.",
    ),
    (
        Signals::has_cta,
        "Call-to-action elements encourage user engagement and conversion.",
    ),
    (
        Signals::has_contact,
        "The contact section facilitates direct communication with users.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub website_type: &'static str,
    pub purpose: &'static str,
    pub style: &'static str,
    pub attention_flow: &'static str,
    pub highlights: Vec<&'static str>,
}

pub fn analyze_intent(doc: &AnalysisResult) -> Intent {
    let signals = Signals::from_document(doc);
    Intent {
        website_type: WEBSITE_TYPE.evaluate(&signals),
        purpose: PURPOSE.evaluate(&signals),
        style: STYLE.evaluate(&signals),
        attention_flow: attention_flow(doc.layout_type()),
        highlights: HIGHLIGHTS
            .iter()
            .filter(|(flag, _)| flag(&signals))
            .map(|(_, sentence)| *sentence)
            .collect(),
    }
}

/// Renders the design-intent paragraph.
pub fn infer_intent(doc: &AnalysisResult) -> String {
    render_intent(&analyze_intent(doc))
}

pub fn render_intent(intent: &Intent) -> String {
    let mut out = format!(
        "Based on the analysis, this design appears to be for {} {} website focused on {} with a {} aesthetic.\n\
         The layout is designed to guide the user's attention {} through the content.\n",
        indefinite_article(intent.website_type),
        intent.website_type,
        intent.purpose,
        intent.style,
        intent.attention_flow,
    );
    for sentence in &intent.highlights {
        out.push_str(sentence);
        out.push('\n');
    }
    out.push_str(&format!(
        "\nWhen implementing this design, focus on maintaining the visual hierarchy and ensuring that the {} aspects are emphasized.",
        intent.purpose
    ));
    out
}
