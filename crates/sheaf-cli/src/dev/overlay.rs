//! Error overlay shown in place of the page while the last cycle is failing.
//!
//! The overlay is cleared by the next successful cycle.

use serde::Serialize;
use sheaf_bundler::BuildError;
use sheaf_graph::ModuleId;

/// Failure details of the most recent cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlay {
    pub messages: Vec<String>,
    /// Modules the errors point at, in error order, without duplicates.
    pub modules: Vec<ModuleId>,
}

impl Overlay {
    pub fn from_error(err: &BuildError) -> Self {
        let leaves = err.leaves();
        let mut modules: Vec<ModuleId> = Vec::new();
        for module in leaves.iter().filter_map(|leaf| leaf.module()) {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }
        Self {
            messages: leaves.iter().map(ToString::to_string).collect(),
            modules,
        }
    }

    /// Standalone page listing every error. All error text is escaped.
    pub fn to_html(&self) -> String {
        let mut items = String::new();
        for message in &self.messages {
            items.push_str("      <li><pre>");
            items.push_str(&html_escape(message));
            items.push_str("</pre></li>\n");
        }
        let modules = self
            .modules
            .iter()
            .map(|module| format!("<code>{}</code>", html_escape(module.as_str())))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Build failed</title>
    <style>
      body {{ margin: 0; padding: 2rem; background: #1e1e1e; color: #f0f0f0; font-family: ui-monospace, monospace; }}
      h1 {{ color: #ff6b6b; font-size: 1.25rem; }}
      pre {{ white-space: pre-wrap; background: #2a2a2a; padding: 1rem; border-left: 3px solid #ff6b6b; }}
      ul {{ list-style: none; padding: 0; }}
    </style>
  </head>
  <body>
    <h1>Build failed</h1>
    <p>Failing modules: {modules}</p>
    <ul>
{items}    </ul>
    <p>Fix the errors and save; the page reloads after the next successful build.</p>
  </body>
</html>
"#
        )
    }
}

/// Escape text for use inside HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(text: &str) -> ModuleId {
        ModuleId::new(text).unwrap()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("plain text"), "plain text");
    }

    #[test]
    fn collects_modules_from_every_leaf() {
        let err = BuildError::Aggregate(vec![
            BuildError::Transform {
                module: id("c.js"),
                engine: "strict".into(),
                message: "unexpected <token>".into(),
            },
            BuildError::TimedOut {
                module: id("c.js"),
                engine: "slow".into(),
                timeout: Duration::from_millis(50),
            },
            BuildError::Task("worker panicked".into()),
        ]);
        let overlay = Overlay::from_error(&err);

        assert_eq!(overlay.modules, vec![id("c.js")]);
        assert_eq!(overlay.messages.len(), 3);

        let html = overlay.to_html();
        assert!(html.contains("<code>c.js</code>"));
        assert!(html.contains("unexpected &lt;token&gt;"));
        assert!(!html.contains("<token>"));
    }
}
