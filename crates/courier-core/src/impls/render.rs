//! `render.template.request` handler.

use async_trait::async_trait;

use crate::domain::{HandlerError, RenderTemplateRequestMessage, RenderTemplateResponseMessage};
use crate::template::{self, Escape};
use crate::typed::Handler;

/// Renders the request's template against its variables, HTML-escaping
/// interpolated values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderTemplateHandler;

#[async_trait]
impl Handler<RenderTemplateRequestMessage> for RenderTemplateHandler {
    async fn handle(
        &self,
        request: RenderTemplateRequestMessage,
    ) -> Result<RenderTemplateResponseMessage, HandlerError> {
        let render = template::render(&request.template, request.variables.as_ref(), Escape::Html)?;
        Ok(RenderTemplateResponseMessage { render })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(template: &str, variables: serde_json::Value) -> RenderTemplateRequestMessage {
        RenderTemplateRequestMessage {
            template: template.into(),
            variables: variables.as_object().cloned(),
        }
    }

    #[tokio::test]
    async fn renders_hello_ada() {
        let response = RenderTemplateHandler
            .handle(request("Hello {{.Name}}", json!({ "Name": "Ada" })))
            .await
            .unwrap();
        assert_eq!(response.render, "Hello Ada");
    }

    #[tokio::test]
    async fn escapes_markup_in_values() {
        let response = RenderTemplateHandler
            .handle(request("<p>{{.x}}</p>", json!({ "x": "<script>" })))
            .await
            .unwrap();
        assert_eq!(response.render, "<p>&lt;script&gt;</p>");
    }

    #[tokio::test]
    async fn parse_failure_is_a_handler_error() {
        let err = RenderTemplateHandler
            .handle(request("Hello {{.Name", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Template(_)));
        assert_eq!(err.to_string(), "template: unclosed action at byte 6");
    }
}
