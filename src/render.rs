//! HTML rendering for the experiment list.

use serde_json::Value;

use crate::store::Experiment;

/// Renders `experiments` into a complete HTML page.
///
/// Every distinct key becomes a column, in the order it was first seen, and every experiment
/// becomes one `<tr class="experiment">` row. `warning` is shown above the table when present.
pub fn render_page(experiments: &[Experiment], warning: Option<&str>) -> String {
    let columns = columns(experiments);
    let mut page = String::new();

    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n<title>Experiments</title>\n");
    page.push_str("</head>\n<body>\n<h1>Experiments</h1>\n");

    if let Some(warning) = warning {
        page.push_str(&format!("<div class=\"warning\">{}</div>\n", escape(warning)));
    }
    page.push_str("<p><a href=\"/refresh\">Refresh from upstream</a></p>\n");

    page.push_str("<table>\n<thead>\n<tr>");
    for column in &columns {
        page.push_str(&format!("<th>{}</th>", escape(column)));
    }
    page.push_str("</tr>\n</thead>\n<tbody>\n");

    for experiment in experiments {
        page.push_str("<tr class=\"experiment\">");
        for column in &columns {
            let cell = experiment.get(*column).map(cell_text).unwrap_or_default();
            page.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        page.push_str("</tr>\n");
    }
    page.push_str("</tbody>\n</table>\n");

    if experiments.is_empty() {
        page.push_str("<p>No experiments recorded yet.</p>\n");
    }
    page.push_str("</body>\n</html>\n");

    page
}

fn columns(experiments: &[Experiment]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for key in experiments.iter().flat_map(|e| e.keys()) {
        if !columns.contains(&key.as_str()) {
            columns.push(key);
        }
    }
    columns
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escapes text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
