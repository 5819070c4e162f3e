//! Parsing of finalized tutor replies into renderable segments.
//!
//! Two independent passes run once per completed reply:
//!
//! * entity extraction lifts `<def>`, `<vocab>` and `<formula>` tags into
//!   [`Extractions`] and leaves only the tag body in the prose;
//! * segment splitting cuts the remaining text at ```` ```html ```` fences,
//!   ```` ```json-chart ```` fences and `[GENERATE_IMAGE: "..."]` directives.
//!
//! Each tag kind is a single non-greedy substitution. Nested tags, or two
//! overlapping tags of the same kind, are not supported and produce whatever
//! the substitution happens to yield.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{
    constants::prompts::CHART_RENDER_ERROR,
    models::domain::{
        ChartSpec, ContentSegment, Definition, ExtractedEntity, Extractions, Formula, Vocabulary,
    },
};

static DEF_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<def term="([^"]+)">([\s\S]*?)</def>"#).expect("DEF_TAG is a valid regex pattern")
});

static VOCAB_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<vocab word="([^"]+)">([\s\S]*?)</vocab>"#)
        .expect("VOCAB_TAG is a valid regex pattern")
});

static FORMULA_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<formula name="([^"]+)">([\s\S]*?)</formula>"#)
        .expect("FORMULA_TAG is a valid regex pattern")
});

static SEGMENT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"```(html|json-chart)\r?\n([\s\S]*?)```|\[GENERATE_IMAGE:\s*"([^"]+)"\]"#)
        .expect("SEGMENT_MARKER is a valid regex pattern")
});

/// Structured form of one assistant reply.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedResponse {
    pub parts: Vec<ContentSegment>,
    pub extractions: Extractions,
}

pub fn parse_response(raw: &str) -> ParsedResponse {
    let (main_text, extractions) = extract_entities(raw);
    let parts = split_segments(main_text.trim());

    ParsedResponse { parts, extractions }
}

fn replace_tag(
    text: &str,
    pattern: &Regex,
    extractions: &mut Extractions,
    make: fn(String, String) -> ExtractedEntity,
) -> String {
    pattern
        .replace_all(text, |caps: &Captures| {
            let attribute = caps[1].trim().to_string();
            let body = caps[2].trim().to_string();
            extractions.push(make(attribute, body.clone()));
            body
        })
        .into_owned()
}

/// Pass A: strip entity tags, keeping their bodies in place.
pub fn extract_entities(text: &str) -> (String, Extractions) {
    let mut extractions = Extractions::default();

    let text = replace_tag(text, &DEF_TAG, &mut extractions, |term, body| {
        ExtractedEntity::Definition(Definition { term, body })
    });
    let text = replace_tag(&text, &VOCAB_TAG, &mut extractions, |word, meaning| {
        ExtractedEntity::Vocabulary(Vocabulary { word, meaning })
    });
    let text = replace_tag(&text, &FORMULA_TAG, &mut extractions, |name, expression| {
        ExtractedEntity::Formula(Formula { name, expression })
    });

    (text, extractions)
}

fn chart_segment(body: &str) -> ContentSegment {
    match serde_json::from_str::<ChartSpec>(body.trim()) {
        Ok(chart) => ContentSegment::Chart { chart },
        Err(err) => {
            log::warn!("Discarding malformed json-chart block: {}", err);
            ContentSegment::text(CHART_RENDER_ERROR)
        }
    }
}

/// Pass B: split text into segments in document order.
pub fn split_segments(text: &str) -> Vec<ContentSegment> {
    let mut parts = Vec::new();
    let mut last_index = 0;

    for caps in SEGMENT_MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };

        if whole.start() > last_index {
            parts.push(ContentSegment::text(&text[last_index..whole.start()]));
        }

        match (caps.get(1).map(|m| m.as_str()), caps.get(2), caps.get(3)) {
            (Some("html"), Some(body), _) => parts.push(ContentSegment::Flowchart {
                html: body.as_str().trim().to_string(),
            }),
            (Some(_), Some(body), _) => parts.push(chart_segment(body.as_str())),
            (_, _, Some(prompt)) => parts.push(ContentSegment::image_placeholder(prompt.as_str())),
            _ => {}
        }

        last_index = whole.end();
    }

    if last_index < text.len() {
        parts.push(ContentSegment::text(&text[last_index..]));
    }

    if parts.is_empty() {
        parts.push(ContentSegment::text(text));
    }
    parts
}
