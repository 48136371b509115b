use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::{Map, Value, json};

use crate::session::Session;

/// Page
///
/// A server-rendered view: an HTML shell naming the view and embedding its
/// context as JSON for the client bundle. `isAuth`/`isAdmin` are always present.
#[derive(Debug, Clone)]
pub struct Page {
    view: &'static str,
    status: StatusCode,
    context: Map<String, Value>,
}

impl Page {
    /// A view whose navbar reflects the visitor's session.
    pub fn new(view: &'static str, session: &Session) -> Self {
        Self::with_auth(view, session.is_auth, session.is_admin)
    }

    /// A view rendered as signed out regardless of the session.
    pub fn anonymous(view: &'static str) -> Self {
        Self::with_auth(view, false, false)
    }

    fn with_auth(view: &'static str, is_auth: bool, is_admin: bool) -> Self {
        let mut context = Map::new();
        context.insert("isAuth".into(), Value::Bool(is_auth));
        context.insert("isAdmin".into(), Value::Bool(is_admin));
        Self {
            view,
            status: StatusCode::OK,
            context,
        }
    }

    pub fn not_found(session: &Session) -> Self {
        Self::new("404", session).status(StatusCode::NOT_FOUND)
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds `key` to the context. Values that fail to serialize become `null`.
    pub fn with(mut self, key: &str, value: impl serde::Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.context.insert(key.to_string(), value);
        self
    }

    pub fn view(&self) -> &'static str {
        self.view
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    fn render(&self) -> String {
        let context = Value::Object(self.context.clone()).to_string();
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Invites</title>\n<link rel=\"stylesheet\" href=\"/static/app.css\">\n</head>\n\
             <body>\n<main id=\"app\" data-view=\"{view}\"></main>\n\
             <script id=\"page-context\" type=\"application/json\">{context}</script>\n\
             <script src=\"/static/app.js\" defer></script>\n</body>\n</html>\n",
            view = self.view,
            context = escape_script(&context),
        )
    }
}

/// Keeps embedded JSON from closing the surrounding `<script>` element.
fn escape_script(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.render())).into_response()
    }
}

/// Body of the catch-all route.
pub fn route_not_found() -> Value {
    json!({ "message": "Route Not Found" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_always_carries_auth_flags() {
        let session = Session {
            is_auth: true,
            is_admin: true,
            ..Session::default()
        };
        let page = Page::new("index", &session);
        assert_eq!(page.context()["isAuth"], Value::Bool(true));
        assert_eq!(page.context()["isAdmin"], Value::Bool(true));

        let anonymous = Page::anonymous("admin/index");
        assert_eq!(anonymous.context()["isAuth"], Value::Bool(false));
    }

    #[test]
    fn embedded_json_cannot_break_out_of_script() {
        let page = Page::anonymous("post").with("title", "</script><b>x</b>");
        let html = page.render();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("\\u003c/script\\u003e"));
        assert!(html.contains("data-view=\"post\""));
    }
}
