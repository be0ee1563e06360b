use crate::types::{Chain, Document, Result, View};
use crate::utils::text::escape_html;
use crate::utils::type_suffix;
use crate::visualization::{visualize, Visualization};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::debug;

/// Everything needed to show a processed document: the source text, the
/// LIF payload and one tab per view.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub text: String,
    pub lif: Option<String>,
    pub views: Vec<ViewTab>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewTab {
    pub id: String,
    pub metadata: String,
    pub annotations: String,
    pub visualizations: Vec<TypeTab>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeTab {
    /// `<view id>:<annotation type>`, also what picks the visualization.
    pub identifier: String,
    pub annotation_type: String,
    pub visualization: Visualization,
}

/// Hands out `View-1`, `View-2`, ... to views that came without an id.
/// Lives for a single render call; ids already used by the document are
/// skipped.
struct ViewIds<'a> {
    count: usize,
    taken: HashSet<&'a str>,
}

impl<'a> ViewIds<'a> {
    fn new(views: &'a [View]) -> Self {
        Self {
            count: 0,
            taken: views.iter().filter_map(|v| v.id.as_deref()).collect(),
        }
    }

    fn id_for(&mut self, view: &View) -> String {
        if let Some(id) = &view.id {
            return id.clone();
        }
        loop {
            self.count += 1;
            let candidate = format!("View-{}", self.count);
            if !self.taken.contains(candidate.as_str()) {
                return candidate;
            }
        }
    }
}

pub fn render_document(document: &Document) -> Result<RenderedDocument> {
    let text = document.text_value().to_string();
    let Some(container) = document.container() else {
        return Ok(RenderedDocument {
            text,
            lif: None,
            views: Vec::new(),
        });
    };

    let mut ids = ViewIds::new(&container.views);
    let mut views = Vec::with_capacity(container.views.len());
    for view in &container.views {
        let id = ids.id_for(view);
        let visualizations = view
            .annotation_types()
            .map(|uri| {
                let annotation_type = type_suffix(uri).to_string();
                let identifier = format!("{}:{}", id, annotation_type);
                let visualization = visualize(&identifier, view, &text);
                TypeTab {
                    identifier,
                    annotation_type,
                    visualization,
                }
            })
            .collect::<Vec<_>>();
        debug!("Rendered view {} with {} visualizations", id, visualizations.len());

        views.push(ViewTab {
            id,
            metadata: serde_json::to_string_pretty(&view.metadata)?,
            annotations: serde_json::to_string_pretty(&view.annotations)?,
            visualizations,
        });
    }

    Ok(RenderedDocument {
        lif: Some(serde_json::to_string_pretty(&document.payload)?),
        text,
        views,
    })
}

impl RenderedDocument {
    pub fn view(&self, id: &str) -> Option<&ViewTab> {
        self.views.iter().find(|v| v.id == id)
    }

    /// Plain-text dump: every visualization under a `== <identifier>` heading.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== Text\n{}\n", self.text);
        for view in &self.views {
            for tab in &view.visualizations {
                let _ = writeln!(out, "== {}\n{}", tab.identifier, tab.visualization);
            }
        }
        out
    }

    /// Stand-alone HTML page with one top-level tab per view and one
    /// second-level tab per annotation type.
    pub fn to_html(&self, chain: Option<&Chain>, source: &str) -> String {
        let mut body = String::new();

        if let Some(chain) = chain {
            let _ = write!(
                body,
                "<dl class=\"bordered\"><dt>{}</dt><dd>",
                escape_html(&chain.identifier)
            );
            for service in &chain.services {
                let _ = write!(body, "{}<br/>", escape_html(&service.identifier));
            }
            body.push_str("</dd></dl>\n");
        }
        let _ = writeln!(body, "<p>Source: {}</p>", escape_html(source));

        body.push_str("<div class=\"tab\">\n");
        body.push_str(&tab_button("Text", "Text", 1));
        if self.lif.is_some() {
            body.push_str(&tab_button("LIF", "LIF", 1));
        }
        for view in &self.views {
            body.push_str(&tab_button(&view.id, &view.id, 1));
        }
        body.push_str("</div>\n");

        body.push_str(&tab_text("Text", &escape_html(&self.text), 1));
        if let Some(lif) = &self.lif {
            body.push_str(&tab_text("LIF", &escape_html(lif), 1));
        }

        for view in &self.views {
            let meta_id = format!("{}:Metadata", view.id);
            let anno_id = format!("{}:Annotations", view.id);
            let _ = writeln!(
                body,
                "<div id=\"{}\" class=\"tab_c1\" style=\"display: none;\">",
                escape_html(&view.id)
            );
            body.push_str("<div class=\"tab2\">\n");
            body.push_str(&tab_button(&meta_id, "Metadata", 2));
            body.push_str(&tab_button(&anno_id, "Annotations", 2));
            for tab in &view.visualizations {
                body.push_str(&tab_button(&tab.identifier, &tab.annotation_type, 2));
            }
            body.push_str("</div>\n");
            body.push_str(&tab_text(&meta_id, &escape_html(&view.metadata), 2));
            body.push_str(&tab_text(&anno_id, &escape_html(&view.annotations), 2));
            for tab in &view.visualizations {
                body.push_str(&tab_text(&tab.identifier, &tab.visualization.to_html(), 2));
            }
            body.push_str("</div>\n");
        }

        PAGE_TEMPLATE.replace("__BODY__", &body)
    }
}

fn tab_button(target: &str, label: &str, level: u8) -> String {
    format!(
        "<button class=\"tab_b{level}\" data-target=\"{}\" onclick=\"display(event, this.dataset.target, 'tab_c{level}', 'tab_b{level}')\">{}</button>\n",
        escape_html(target),
        escape_html(label),
    )
}

/// `content` must already be HTML.
fn tab_text(id: &str, content: &str, level: u8) -> String {
    format!(
        "<div id=\"{}\" class=\"tab_c{level}\" style=\"display: none;\"><div class=\"result pre\">{}</div></div>\n",
        escape_html(id),
        content,
    )
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>LAPPS chain result</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 16px; }
  dl.bordered { border: 1px solid #ddd; padding: 8px; }
  .tab, .tab2 { overflow: hidden; border-bottom: 1px solid #ccc; margin-top: 8px; }
  .tab button, .tab2 button { background: inherit; border: none; cursor: pointer; padding: 8px 12px; }
  .tab button.active, .tab2 button.active { background: #ddd; }
  .result { padding: 8px; }
  .pre { white-space: pre-wrap; font-family: ui-monospace, Menlo, Consolas, monospace; }
</style>
<script>
function display(evt, identifier, content, tab) {
  var i, tabcontents, tablinks;
  tabcontents = document.getElementsByClassName(content);
  for (i = 0; i < tabcontents.length; i++) {
    tabcontents[i].style.display = "none";
  }
  tablinks = document.getElementsByClassName(tab);
  for (i = 0; i < tablinks.length; i++) {
    tablinks[i].className = tablinks[i].className.replace(" active", "");
  }
  document.getElementById(identifier).style.display = "block";
  evt.currentTarget.className += " active";
}
</script>
</head>
<body>
__BODY__
</body>
</html>
"#;
