//! Per-type renderings of a single view.
//!
//! A visualization is picked from the tab identifier (`View-3:NamedEntity`,
//! `v2:Token#pos`, ...) by suffix, trying the renderers in [`VISUALIZERS`]
//! in order and falling back to a table of markables. Missing offsets,
//! features or labels render as [`PLACEHOLDER`]; nothing here fails.

use crate::types::{Annotation, View};
use crate::utils::text::{abbreviate, char_len, char_slice, escape_html};
use std::collections::HashMap;
use std::fmt;

pub const PLACEHOLDER: &str = "-";

/// Annotation types shown by the named entity rendering.
pub const ENTITY_TYPES: &[&str] = &["NamedEntity", "Person", "Location"];

pub type Renderer = fn(&View, &str) -> Visualization;

/// (identifier suffix, renderer), first match wins.
///
/// `Token` and `Token#pos` are independent checks: an identifier ending in
/// `Token#pos` does not end in `Token`.
pub const VISUALIZERS: &[(&str, Renderer)] = &[
    ("Token", tokens as Renderer),
    ("Token#pos", tokens_with_pos as Renderer),
    ("Sentence", one_sentence_per_line as Renderer),
    ("NamedEntity", entities as Renderer),
    ("PhraseStructure", phrase_structures as Renderer),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Visualization {
    Text(String),
    /// Document text with entity markers inlined.
    Marked(Vec<Inline>),
    Table(Vec<MarkableRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    EntityStart,
    EntityEnd { abbreviation: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkableRow {
    pub kind: String,
    pub span: String,
    pub covered: String,
    pub features: Vec<(String, String)>,
}

pub fn visualize(identifier: &str, view: &View, text: &str) -> Visualization {
    VISUALIZERS
        .iter()
        .find(|(suffix, _)| identifier.ends_with(suffix))
        .map(|(_, render)| render(view, text))
        .unwrap_or_else(|| table_of_markables(view, text))
}

pub fn tokens(view: &View, _text: &str) -> Visualization {
    let mut s = String::new();
    for token in view.annotations.iter().filter(|a| a.kind.ends_with("Token")) {
        s.push_str(&feature_or_placeholder(token, "word"));
        s.push(' ');
    }
    Visualization::Text(s)
}

pub fn tokens_with_pos(view: &View, _text: &str) -> Visualization {
    let mut s = String::new();
    for token in view.annotations.iter().filter(|a| a.kind.ends_with("Token#pos")) {
        s.push_str(&format!(
            "{}/{} ",
            feature_or_placeholder(token, "word"),
            feature_or_placeholder(token, "pos")
        ));
    }
    Visualization::Text(s)
}

pub fn one_sentence_per_line(view: &View, text: &str) -> Visualization {
    let text_len = char_len(text);
    let mut s = String::new();
    for sentence in view.annotations.iter().filter(|a| a.kind.ends_with("Sentence")) {
        let covered = sentence
            .span(text_len)
            .map(|range| char_slice(text, range))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        s.push_str(&covered);
        s.push_str("\n\n");
    }
    Visualization::Text(s)
}

/// The whole text with entities marked. Offsets are recorded per position,
/// so when two entities share a boundary the later one decides the type
/// shown there. Entities without a valid span are left out; empty ones are
/// marked as an empty pair at their offset.
pub fn entities(view: &View, text: &str) -> Visualization {
    let text_len = char_len(text);
    let mut starts: HashMap<usize, &str> = HashMap::new();
    let mut ends: HashMap<usize, &str> = HashMap::new();
    let mut empty: HashMap<usize, &str> = HashMap::new();
    for a in &view.annotations {
        let kind = a.type_suffix();
        if !ENTITY_TYPES.contains(&kind) {
            continue;
        }
        let Some(span) = a.span(text_len) else {
            continue;
        };
        if span.is_empty() {
            empty.insert(span.start, kind);
        } else {
            starts.insert(span.start, kind);
            ends.insert(span.end, kind);
        }
    }

    let mut inlines = Vec::new();
    let mut run = String::new();
    for (i, c) in text.chars().enumerate() {
        mark_position(i, &starts, &ends, &empty, &mut inlines, &mut run);
        run.push(c);
    }
    // An entity can end at the very end of the text.
    mark_position(text_len, &starts, &ends, &empty, &mut inlines, &mut run);
    flush(&mut inlines, &mut run);

    Visualization::Marked(inlines)
}

/// Close, then empty pair, then open.
fn mark_position(
    i: usize,
    starts: &HashMap<usize, &str>,
    ends: &HashMap<usize, &str>,
    empty: &HashMap<usize, &str>,
    inlines: &mut Vec<Inline>,
    run: &mut String,
) {
    if let Some(kind) = ends.get(&i) {
        flush(inlines, run);
        inlines.push(Inline::EntityEnd {
            abbreviation: abbreviate(kind),
        });
    }
    if let Some(kind) = empty.get(&i) {
        flush(inlines, run);
        inlines.push(Inline::EntityStart);
        inlines.push(Inline::EntityEnd {
            abbreviation: abbreviate(kind),
        });
    }
    if starts.contains_key(&i) {
        flush(inlines, run);
        inlines.push(Inline::EntityStart);
    }
}

fn flush(inlines: &mut Vec<Inline>, run: &mut String) {
    if !run.is_empty() {
        inlines.push(Inline::Text(std::mem::take(run)));
    }
}

pub fn phrase_structures(view: &View, _text: &str) -> Visualization {
    let mut s = String::new();
    for phrase in view
        .annotations
        .iter()
        .filter(|a| a.type_suffix() == "PhraseStructure")
    {
        s.push_str(&feature_or_placeholder(phrase, "sentence"));
        s.push_str("\n\n");
        s.push_str(&feature_or_placeholder(phrase, "penntree"));
        s.push('\n');
    }
    Visualization::Text(s)
}

pub fn table_of_markables(view: &View, text: &str) -> Visualization {
    let text_len = char_len(text);
    let rows = view
        .annotations
        .iter()
        .map(|a| {
            let mut features = Vec::with_capacity(a.features.len() + 1);
            if let Some(label) = &a.label {
                features.push(("label".to_string(), label.clone()));
            }
            features.extend(
                a.features
                    .iter()
                    .map(|(key, value)| (key.clone(), lif::value_to_string(value))),
            );

            MarkableRow {
                kind: a.type_suffix().to_string(),
                span: span_string(a),
                covered: a
                    .span(text_len)
                    .map(|range| char_slice(text, range))
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                features,
            }
        })
        .collect();
    Visualization::Table(rows)
}

fn span_string(a: &Annotation) -> String {
    match (a.start, a.end) {
        (Some(start), Some(end)) => format!("{}:{}", start, end),
        (Some(start), None) => format!("{}:{}", start, PLACEHOLDER),
        (None, Some(end)) => format!("{}:{}", PLACEHOLDER, end),
        (None, None) => PLACEHOLDER.to_string(),
    }
}

fn feature_or_placeholder(a: &Annotation, key: &str) -> String {
    a.feature(key).unwrap_or_else(|| PLACEHOLDER.to_string())
}

impl Visualization {
    pub fn to_html(&self) -> String {
        match self {
            Visualization::Text(text) => escape_html(text),
            Visualization::Marked(inlines) => inlines
                .iter()
                .map(|inline| match inline {
                    Inline::Text(text) => escape_html(text),
                    Inline::EntityStart => "<e style=\"color:blue;\">".to_string(),
                    Inline::EntityEnd { abbreviation } => {
                        format!("</e><sup>{}</sup>", escape_html(abbreviation))
                    }
                })
                .collect(),
            Visualization::Table(rows) => {
                let mut html = String::from("<table cellpadding=\"8\">\n");
                for row in rows {
                    let features = row
                        .features
                        .iter()
                        .map(|(k, v)| format!("{}={}", escape_html(k), escape_html(v)))
                        .collect::<Vec<_>>()
                        .join("<br/>");
                    html.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                        escape_html(&row.kind),
                        escape_html(&row.span),
                        escape_html(&row.covered),
                        features
                    ));
                }
                html.push_str("</table>");
                html
            }
        }
    }
}

/// Plain-text form: entities as `[Boston]^loc`, tables one row per line.
impl fmt::Display for Visualization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visualization::Text(text) => f.write_str(text),
            Visualization::Marked(inlines) => {
                for inline in inlines {
                    match inline {
                        Inline::Text(text) => f.write_str(text)?,
                        Inline::EntityStart => f.write_str("[")?,
                        Inline::EntityEnd { abbreviation } => write!(f, "]^{}", abbreviation)?,
                    }
                }
                Ok(())
            }
            Visualization::Table(rows) => {
                for row in rows {
                    let features = row
                        .features
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join(" ");
                    writeln!(f, "{}\t{}\t{}\t{}", row.kind, row.span, row.covered, features)?;
                }
                Ok(())
            }
        }
    }
}
