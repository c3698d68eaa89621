use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;

use tracing::warn;

use crate::error::AppError;

/// Flat key/value substitution context for page rendering.
#[derive(Debug, Default)]
pub struct Context {
    values: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Absent values render as the empty string, never as a literal "None".
    pub fn set_opt(&mut self, key: &str, value: Option<impl Display>) -> &mut Self {
        match value {
            Some(v) => self.set(key, v),
            None => self.set(key, ""),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }
}

/// Loads template files from a directory and performs literal `{{key}}`
/// substitution. Substitution is single-pass and non-recursive; values are
/// inserted verbatim, so callers sanitize user-supplied strings before they
/// reach a context.
#[derive(Clone)]
pub struct Templates {
    dir: PathBuf,
}

impl Templates {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn render(&self, name: &str, ctx: &Context) -> Result<String, AppError> {
        let path = self.dir.join(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|_| AppError::TemplateNotFound(name.to_string()))?;
        Ok(substitute(name, &source, ctx))
    }
}

/// Single left-to-right pass over the source. A marker whose key is missing
/// from the context is scrubbed to the empty string (with a warning) instead
/// of leaking raw `{{...}}` syntax into the response.
fn substitute(template: &str, source: &str, ctx: &Context) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let key = &after[..close];
                match ctx.get(key.trim()) {
                    Some(value) => out.push_str(value),
                    None => {
                        warn!(template, key = key.trim(), "unmatched template marker");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                // Unterminated marker: keep the tail as-is.
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// HTML-entity-encode the characters that matter for injection into markup.
/// Applied by handlers to every user-supplied string before it enters a
/// render context or a generated fragment.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_markers() {
        let mut ctx = Context::new();
        ctx.set("nome", "Mario").set("anno", 2024);
        let out = substitute("t", "Ciao {{nome}}, benvenuto nel {{anno}}!", &ctx);
        assert_eq!(out, "Ciao Mario, benvenuto nel 2024!");
    }

    #[test]
    fn absent_values_render_empty() {
        let mut ctx = Context::new();
        ctx.set_opt("telefono", None::<&str>);
        let out = substitute("t", "Tel: {{telefono}}.", &ctx);
        assert_eq!(out, "Tel: .");
    }

    #[test]
    fn unmatched_marker_is_scrubbed() {
        let ctx = Context::new();
        let out = substitute("t", "before {{missing}} after", &ctx);
        assert_eq!(out, "before  after");
    }

    #[test]
    fn substitution_is_not_recursive() {
        let mut ctx = Context::new();
        ctx.set("a", "{{b}}").set("b", "nested");
        let out = substitute("t", "{{a}}", &ctx);
        assert_eq!(out, "{{b}}");
    }

    #[test]
    fn unterminated_marker_is_left_alone() {
        let ctx = Context::new();
        let out = substitute("t", "text {{oops", &ctx);
        assert_eq!(out, "text {{oops");
    }

    #[test]
    fn render_reads_from_disk_and_reports_missing_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "<h1>{{title}}</h1>").unwrap();

        let templates = Templates::new(dir.path().to_path_buf());
        let mut ctx = Context::new();
        ctx.set("title", "Ciao");
        assert_eq!(templates.render("hello.html", &ctx).unwrap(), "<h1>Ciao</h1>");

        let missing = templates.render("nope.html", &ctx);
        assert!(matches!(missing, Err(AppError::TemplateNotFound(_))));
    }

    #[test]
    fn sanitize_encodes_markup_characters() {
        assert_eq!(
            sanitize(r#"<script>alert("x")</script> a/'b"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;&#x2F;script&gt; a&#x2F;&#x27;b"
        );
    }
}
