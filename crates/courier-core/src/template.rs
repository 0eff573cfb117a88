//! Minimal text templates in the `{{.Field}}` style.
//!
//! Supported actions:
//! - `{{.}}` - the whole variable map
//! - `{{.Name}}`, `{{.user.name}}` - field lookup, nested through objects
//! - `{{- ... -}}` - trim whitespace on either side
//! - `{{/* ... */}}` - comment
//!
//! Anything else (`if`, `range`, pipelines, ...) is rejected at parse time.
//! Missing fields render as the empty string.

use serde_json::Value;

use crate::domain::Variables;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template: unclosed action at byte {0}")]
    Unclosed(usize),

    #[error("template: unsupported action \"{0}\"")]
    Unsupported(String),
}

/// How interpolated values are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    None,
    Html,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    /// Empty path means `{{.}}`.
    Field(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut nodes = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        let mut trim_next = false;

        while let Some(open) = rest.find("{{") {
            let mut text = &rest[..open];
            if trim_next {
                text = text.trim_start();
            }
            let inner_start = open + 2;
            let close = rest[inner_start..]
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + open))?;
            let mut inner = &rest[inner_start..inner_start + close];

            if inner.len() >= 2
                && inner.starts_with('-')
                && inner[1..].starts_with(char::is_whitespace)
            {
                text = text.trim_end();
                inner = &inner[1..];
            }
            trim_next = false;
            if inner.len() >= 2
                && inner.ends_with('-')
                && inner[..inner.len() - 1].ends_with(char::is_whitespace)
            {
                trim_next = true;
                inner = &inner[..inner.len() - 1];
            }

            if !text.is_empty() {
                nodes.push(Node::Text(text.to_string()));
            }
            if let Some(node) = parse_action(inner.trim())? {
                nodes.push(node);
            }

            let consumed = inner_start + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        let tail = if trim_next { rest.trim_start() } else { rest };
        if !tail.is_empty() {
            nodes.push(Node::Text(tail.to_string()));
        }
        Ok(Self { nodes })
    }

    pub fn render(&self, variables: Option<&Variables>, escape: Escape) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Field(path) => {
                    let value = lookup(variables, path);
                    let text = format_value(value.as_ref());
                    match escape {
                        Escape::None => out.push_str(&text),
                        Escape::Html => push_html_escaped(&mut out, &text),
                    }
                }
            }
        }
        out
    }
}

/// Parse and render in one go.
pub fn render(
    source: &str,
    variables: Option<&Variables>,
    escape: Escape,
) -> Result<String, TemplateError> {
    Ok(Template::parse(source)?.render(variables, escape))
}

fn parse_action(action: &str) -> Result<Option<Node>, TemplateError> {
    if action.starts_with("/*") && action.ends_with("*/") && action.len() >= 4 {
        return Ok(None);
    }
    if action == "." {
        return Ok(Some(Node::Field(Vec::new())));
    }
    let Some(path) = action.strip_prefix('.') else {
        return Err(TemplateError::Unsupported(action.to_string()));
    };
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let valid = segments.iter().all(|s| {
        !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
    });
    if !valid {
        return Err(TemplateError::Unsupported(action.to_string()));
    }
    Ok(Some(Node::Field(segments)))
}

fn lookup(variables: Option<&Variables>, path: &[String]) -> Option<Value> {
    let variables = variables?;
    let Some((first, rest)) = path.split_first() else {
        return Some(Value::Object(variables.clone()));
    };
    let mut current = variables.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn push_html_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '+' => out.push_str("&#43;"),
            '\0' => out.push('\u{FFFD}'),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn vars(value: Value) -> Variables {
        match value {
            Value::Object(map) => map,
            _ => panic!("variables must be an object"),
        }
    }

    #[test]
    fn renders_simple_field() {
        let v = vars(json!({ "Name": "Ada" }));
        assert_eq!(render("Hello {{.Name}}", Some(&v), Escape::Html).unwrap(), "Hello Ada");
    }

    #[rstest]
    #[case::nested("{{.user.name}}", "Grace")]
    #[case::number("{{.count}}", "3")]
    #[case::bool("{{.ok}}", "true")]
    #[case::missing("[{{.nope}}]", "[]")]
    #[case::missing_nested("[{{.user.nope.deeper}}]", "[]")]
    #[case::null("[{{.nothing}}]", "[]")]
    #[case::spaces("{{ .count }}", "3")]
    #[case::comment("a{{/* note */}}b", "ab")]
    #[case::trim_both("a  {{- .count -}}  b", "a3b")]
    #[case::trim_left_only("a  {{- .count }}  b", "a3  b")]
    #[case::no_actions("plain text", "plain text")]
    fn renders_actions(#[case] source: &str, #[case] expected: &str) {
        let v = vars(json!({
            "user": { "name": "Grace" },
            "count": 3,
            "ok": true,
            "nothing": null,
        }));
        assert_eq!(render(source, Some(&v), Escape::None).unwrap(), expected);
    }

    #[test]
    fn dot_renders_whole_map() {
        let v = vars(json!({ "a": 1 }));
        assert_eq!(render("{{.}}", Some(&v), Escape::None).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn no_variables_renders_empty_fields() {
        assert_eq!(render("Hi {{.Name}}!", None, Escape::Html).unwrap(), "Hi !");
    }

    #[test]
    fn html_escape_applies_to_values_only() {
        let v = vars(json!({ "x": "<b>\"Tom\" & 'Jerry'</b>" }));
        assert_eq!(
            render("<p>{{.x}}</p>", Some(&v), Escape::Html).unwrap(),
            "<p>&lt;b&gt;&#34;Tom&#34; &amp; &#39;Jerry&#39;&lt;/b&gt;</p>"
        );
    }

    #[rstest]
    #[case::plus("1+1", "1&#43;1")]
    #[case::nul("a\u{0}b", "a\u{FFFD}b")]
    #[case::plain("abc", "abc")]
    fn html_escape_covers_plus_and_nul(#[case] value: &str, #[case] expected: &str) {
        let v = vars(json!({ "x": value }));
        assert_eq!(render("{{.x}}", Some(&v), Escape::Html).unwrap(), expected);
    }

    #[test]
    fn url_templates_are_not_escaped() {
        let v = vars(json!({ "q": "a&b" }));
        assert_eq!(
            render("https://example.invalid/?q={{.q}}", Some(&v), Escape::None).unwrap(),
            "https://example.invalid/?q=a&b"
        );
    }

    #[test]
    fn unclosed_action_is_an_error() {
        assert_eq!(
            Template::parse("Hello {{.Name").unwrap_err(),
            TemplateError::Unclosed(6)
        );
    }

    #[rstest]
    #[case("{{if .x}}y{{end}}")]
    #[case("{{.x | printf}}")]
    #[case("{{}}")]
    #[case("{{.a..b}}")]
    fn unsupported_actions_are_errors(#[case] source: &str) {
        assert!(matches!(
            Template::parse(source),
            Err(TemplateError::Unsupported(_))
        ));
    }
}
