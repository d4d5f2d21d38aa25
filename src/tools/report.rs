//! Report writer
//!
//! Renders a title and tabular or free-form data to an HTML file in the
//! report directory.

use crate::error::Result;
use crate::tools::{ArgField, ArgKind, ArgumentSchema, Tool, ToolArgs, ToolSpec};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const WRITE_REPORT: &str = "write_report";

/// Writes HTML reports to a directory
pub struct WriteReportTool {
    spec: ToolSpec,
    dir: PathBuf,
}

impl WriteReportTool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            spec: ToolSpec {
                name: WRITE_REPORT,
                description: "Write an HTML report to disk. Use this whenever the user asks \
                              for a report. Pass a title and the data to include: a list of \
                              rows (objects or lists) renders as a table, anything else as text.",
                arguments: ArgumentSchema::new(vec![
                    ArgField::required("title", ArgKind::String, "Title of the report"),
                    ArgField::required(
                        "rows",
                        ArgKind::Json,
                        "Report data: a list of row objects, a list of row lists, or text",
                    ),
                ]),
            },
            dir: dir.into(),
        }
    }

    /// Directory reports are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render and write a report, returning a confirmation
    ///
    /// Filesystem failures are reported in the returned text.
    pub async fn write_report(&self, title: &str, rows: &Value) -> String {
        let path = self.dir.join(format!("{}.html", slugify(title)));
        let html = render_html(title, rows);

        let written = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, html).await
        }
        .await;

        match written {
            Ok(()) => {
                info!(path = %path.display(), "report written");
                format!("Report written to {}", path.display())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to write report");
                format!("Failed to write report to {}: {}", path.display(), e)
            }
        }
    }
}

#[async_trait]
impl Tool for WriteReportTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        let title = args.string("title")?;
        let rows = args.json("rows")?;
        Ok(self.write_report(&title, rows).await)
    }
}

/// File-name-safe form of a title
fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_body(rows: &Value) -> String {
    let items = match rows {
        Value::Array(items) if !items.is_empty() => items,
        Value::Array(_) => return "<p>No rows.</p>".to_string(),
        Value::String(text) => return format!("<pre>{}</pre>", escape_html(text)),
        other => {
            let pretty = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            return format!("<pre>{}</pre>", escape_html(&pretty));
        }
    };

    let mut html = String::from("<table>\n");

    // Header from the keys of all object rows
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    if !columns.is_empty() {
        html.push_str("<thead><tr>");
        for column in &columns {
            html.push_str(&format!("<th>{}</th>", escape_html(column)));
        }
        html.push_str("</tr></thead>\n");
    }

    html.push_str("<tbody>\n");
    for item in items {
        html.push_str("<tr>");
        match item {
            Value::Object(map) => {
                for column in &columns {
                    let text = map.get(column).map(cell_text).unwrap_or_default();
                    html.push_str(&format!("<td>{}</td>", escape_html(&text)));
                }
            }
            Value::Array(cells) => {
                for cell in cells {
                    html.push_str(&format!("<td>{}</td>", escape_html(&cell_text(cell))));
                }
            }
            scalar => {
                html.push_str(&format!("<td>{}</td>", escape_html(&cell_text(scalar))));
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");

    html
}

/// Full HTML document for a report
pub fn render_html(title: &str, rows: &Value) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>table {{ border-collapse: collapse; }} th, td {{ border: 1px solid #ccc; padding: 4px 8px; }}</style>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         {body}\n\
         <p><small>Generated {generated}</small></p>\n\
         </body>\n\
         </html>\n",
        title = title,
        body = render_body(rows),
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
