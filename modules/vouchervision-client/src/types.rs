use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, VoucherVisionError};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

// --- Request side ---

/// Per-run processing options sent with every request.
///
/// `headers` holds whatever authentication the caller chose. The client
/// attaches the entries verbatim and never interprets them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub engines: Vec<String>,
    pub prompt: Option<String>,
    pub ocr_only: bool,
    pub notebook_mode: bool,
    pub include_wfo: bool,
    pub llm_model: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new(engines: Vec<String>) -> Self {
        Self {
            engines,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.headers.insert(API_KEY_HEADER.to_string(), key.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.headers.insert(
            AUTHORIZATION_HEADER.to_string(),
            format!("Bearer {}", token.into()),
        );
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.engines.iter().all(|e| e.trim().is_empty()) {
            return Err(VoucherVisionError::InvalidOptions(
                "at least one engine must be selected".to_string(),
            ));
        }
        Ok(())
    }

    /// Multipart/text form fields shared by both endpoints, in send order.
    pub(crate) fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = self
            .engines
            .iter()
            .map(|engine| ("engines", engine.clone()))
            .collect();
        if self.ocr_only {
            fields.push(("ocr_only", "true".to_string()));
        }
        if self.notebook_mode {
            fields.push(("notebook_mode", "true".to_string()));
        }
        if self.include_wfo {
            fields.push(("include_wfo", "true".to_string()));
        }
        if let Some(prompt) = self.prompt.as_ref().filter(|p| !p.is_empty()) {
            fields.push(("prompt", prompt.clone()));
        }
        if let Some(model) = self.llm_model.as_ref().filter(|m| !m.is_empty()) {
            fields.push(("llm_model", model.clone()));
        }
        fields
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("engines", &self.engines)
            .field("prompt", &self.prompt)
            .field("ocr_only", &self.ocr_only)
            .field("notebook_mode", &self.notebook_mode)
            .field("include_wfo", &self.include_wfo)
            .field("llm_model", &self.llm_model)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// JSON body for `/process-url`.
#[derive(Debug, Serialize)]
pub(crate) struct UrlRequest<'a> {
    pub image_url: &'a str,
    pub engines: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_only: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notebook_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_wfo: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<&'a str>,
}

impl<'a> UrlRequest<'a> {
    pub(crate) fn new(image_url: &'a str, options: &'a RequestOptions) -> Self {
        let flag = |on: bool| on.then_some("true");
        Self {
            image_url,
            engines: &options.engines,
            prompt: options.prompt.as_deref().filter(|p| !p.is_empty()),
            ocr_only: flag(options.ocr_only),
            notebook_mode: flag(options.notebook_mode),
            include_wfo: flag(options.include_wfo),
            llm_model: options.llm_model.as_deref().filter(|m| !m.is_empty()),
        }
    }
}

// --- Response side ---

/// Typed view over a processing response.
///
/// The service returns a loosely shaped object whose optional fields vary
/// by engine and mode. Missing or wrong-typed fields come out as `None` or
/// empty rather than failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessResponse {
    pub filename: Option<String>,
    pub formatted_json: Option<Map<String, Value>>,
    pub formatted_md: Option<String>,
    pub ocr: Option<String>,
    /// Keys of `ocr_info` in response order, i.e. the engines that produced
    /// OCR text.
    pub ocr_engines: Vec<String>,
    /// Base64 JPEG from `collage_info.image_collage`.
    pub image_collage: Option<String>,
}

impl ProcessResponse {
    pub fn from_value(raw: &Value) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            filename: text("filename"),
            formatted_json: raw
                .get("formatted_json")
                .and_then(Value::as_object)
                .cloned(),
            formatted_md: text("formatted_md"),
            ocr: text("ocr"),
            ocr_engines: raw
                .get("ocr_info")
                .and_then(Value::as_object)
                .map(|info| info.keys().cloned().collect())
                .unwrap_or_default(),
            image_collage: raw
                .get("collage_info")
                .and_then(|c| c.get("image_collage"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// Markdown text for this response: `formatted_md` when it has content,
    /// otherwise the raw OCR text. Both trimmed.
    pub fn markdown(&self) -> Option<&str> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref()
                .map(str::trim)
                .filter(|trimmed| !trimmed.is_empty())
        }
        non_empty(&self.formatted_md).or_else(|| non_empty(&self.ocr))
    }

    pub fn engine_list(&self) -> String {
        self.ocr_engines.join("+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn markdown_prefers_formatted_md() {
        let resp = ProcessResponse::from_value(&json!({
            "formatted_md": "  # Label  ",
            "ocr": "raw text"
        }));
        assert_eq!(resp.markdown(), Some("# Label"));
    }

    #[test]
    fn markdown_falls_back_to_ocr_when_blank() {
        let resp = ProcessResponse::from_value(&json!({
            "formatted_md": "   ",
            "ocr": " raw text\n"
        }));
        assert_eq!(resp.markdown(), Some("raw text"));
    }

    #[test]
    fn wrong_typed_fields_degrade_to_none() {
        let resp = ProcessResponse::from_value(&json!({
            "formatted_json": "not an object",
            "formatted_md": 42,
            "ocr_info": ["gemini"],
            "collage_info": {"image_collage": null}
        }));
        assert_eq!(resp, ProcessResponse::default());
        assert_eq!(resp.markdown(), None);
    }

    #[test]
    fn engine_list_joins_ocr_info_keys() {
        let resp = ProcessResponse::from_value(&json!({
            "ocr_info": {"gemini-1.5-pro": {"tokens_in": 10}, "gemini-2.0-flash": {}}
        }));
        assert_eq!(resp.engine_list(), "gemini-1.5-pro+gemini-2.0-flash");
    }

    #[test]
    fn engine_list_keeps_response_key_order() {
        let raw: Value = serde_json::from_str(
            r#"{"ocr_info": {"gemini-2.0-flash": {}, "Azure": {}, "gemini-1.5-pro": {}}}"#,
        )
        .unwrap();
        let resp = ProcessResponse::from_value(&raw);
        assert_eq!(resp.ocr_engines, vec!["gemini-2.0-flash", "Azure", "gemini-1.5-pro"]);
        assert_eq!(resp.engine_list(), "gemini-2.0-flash+Azure+gemini-1.5-pro");
    }

    #[test]
    fn validate_rejects_empty_engines() {
        assert!(RequestOptions::new(vec![]).validate().is_err());
        assert!(RequestOptions::new(vec![" ".into()]).validate().is_err());
        assert!(RequestOptions::new(vec!["gemini-2.0-flash".into()])
            .validate()
            .is_ok());
    }

    #[test]
    fn form_fields_only_include_set_flags() {
        let mut options = RequestOptions::new(vec!["a".into(), "b".into()]);
        options.notebook_mode = true;
        options.prompt = Some(String::new());
        options.llm_model = Some("gemini-2.5-pro".into());

        let fields = options.form_fields();
        assert_eq!(
            fields,
            vec![
                ("engines", "a".to_string()),
                ("engines", "b".to_string()),
                ("notebook_mode", "true".to_string()),
                ("llm_model", "gemini-2.5-pro".to_string()),
            ]
        );
    }

    #[test]
    fn debug_hides_header_values() {
        let options = RequestOptions::new(vec!["a".into()]).with_api_key("secret-key");
        let rendered = format!("{options:?}");
        assert!(rendered.contains("X-API-Key"));
        assert!(!rendered.contains("secret-key"));
    }
}
