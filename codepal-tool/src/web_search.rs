//! Keyword search against a web page, scraped with a CSS selector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codepal_core::{CoreError, Result, Tool, ToolContext};
use scraper::{Html, Selector};
use serde_json::{Value, json};
use tracing::{info, warn};

/// Per-request timeout for search pages.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// User agent sent with every search request.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// A tool that fetches `<base_url>?<query_param>=<keyword>` and returns the
/// trimmed text of every element matching a CSS selector, one per line.
///
/// Network failures, timeouts and error statuses are reported to the model as
/// the tool's output text instead of failing the call.
///
/// # Example
///
/// ```rust,ignore
/// use codepal_tool::WebSearchTool;
///
/// let tool = WebSearchTool::builder("DocsSearch", "https://docs.rs/releases/search")
///     .query_param("query")
///     .selector(".release .name")
///     .description("Search crates on docs.rs")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    name: String,
    description: String,
    base_url: String,
    query_param: String,
    selector: Selector,
    keyword_description: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    /// Start building a tool named `name` that searches `base_url`.
    pub fn builder(name: impl Into<String>, base_url: impl Into<String>) -> WebSearchToolBuilder {
        WebSearchToolBuilder {
            name: name.into(),
            base_url: base_url.into(),
            description: String::new(),
            query_param: "q".to_string(),
            selector: "a".to_string(),
            keyword_description: "The keyword to search".to_string(),
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Coding problems from leetcode.cn.
    pub fn code_questions() -> Result<Self> {
        Self::builder("CodeQuestionTool", "https://leetcode.cn/search/")
            .description(
                "Find relevant code questions based on a keyword. \
                 Use this tool when the user asks for code questions. \
                 The input should be a clear search keyword.",
            )
            .query_param("q")
            .selector("a")
            .keyword_description("The keyword to search")
            .build()
    }

    /// Interview questions from mianshiya.com.
    pub fn interview_questions() -> Result<Self> {
        Self::builder("InterviewQuestionTool", "https://mianshiya.com/search/all")
            .description(
                "Retrieves relevant interview questions from mianshiya.com based on a keyword. \
                 Use this tool when the user asks for interview questions about computer network. \
                 The input should be a clear search keyword.",
            )
            .query_param("searchText")
            .selector(".ant-table-cell > a")
            .keyword_description("the keyword to search")
            .build()
    }

    /// The URL requested for `keyword`.
    pub fn search_url(&self, keyword: &str) -> String {
        let joiner = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{joiner}{}={}", self.base_url, self.query_param, urlencoding::encode(keyword))
    }

    /// Fetch and scrape results for `keyword`.
    ///
    /// Returns the newline-joined element texts, or the failure message.
    pub async fn search(&self, keyword: &str) -> std::result::Result<String, String> {
        let url = self.search_url(keyword);
        info!(tool = %self.name, keyword, %url, "searching");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| e.to_string())?;
        let body = response.text().await.map_err(|e| e.to_string())?;

        Ok(self.extract(&body))
    }

    fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .map(|element| {
                let text: String = element.text().collect();
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builder for [`WebSearchTool`].
#[derive(Debug, Clone)]
pub struct WebSearchToolBuilder {
    name: String,
    base_url: String,
    description: String,
    query_param: String,
    selector: String,
    keyword_description: String,
    timeout: Duration,
}

impl WebSearchToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Query-string parameter carrying the keyword. Defaults to `q`.
    pub fn query_param(mut self, param: impl Into<String>) -> Self {
        self.query_param = param.into();
        self
    }

    /// CSS selector of result elements. Defaults to `a`.
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Description of the `keyword` parameter shown to the model.
    pub fn keyword_description(mut self, description: impl Into<String>) -> Self {
        self.keyword_description = description.into();
        self
    }

    /// Override the 5 second fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the selector and build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] for an empty name or base URL, an
    /// unparseable selector, or an HTTP client that cannot be built.
    pub fn build(self) -> Result<WebSearchTool> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Config("tool name must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(CoreError::Config(format!("tool '{}' needs a base URL", self.name)));
        }
        let selector = Selector::parse(&self.selector).map_err(|e| {
            CoreError::Config(format!("invalid selector '{}' for '{}': {e}", self.selector, self.name))
        })?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(WebSearchTool {
            name: self.name,
            description: self.description,
            base_url: self.base_url,
            query_param: self.query_param,
            selector,
            keyword_description: self.keyword_description,
            client,
        })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": self.keyword_description,
                }
            },
            "required": ["keyword"]
        }))
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
        let keyword = args
            .get("keyword")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::Tool(format!("{}: missing string argument 'keyword'", self.name)))?;

        let output = match self.search(keyword).await {
            Ok(text) => text,
            Err(message) => {
                warn!(tool = %self.name, keyword, error = %message, "search failed");
                message
            }
        };
        Ok(json!({ "output": output }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_build() {
        let code = WebSearchTool::code_questions().unwrap();
        assert_eq!(code.name(), "CodeQuestionTool");
        assert_eq!(code.search_url("two sum"), "https://leetcode.cn/search/?q=two%20sum");

        let interview = WebSearchTool::interview_questions().unwrap();
        assert_eq!(interview.name(), "InterviewQuestionTool");
        assert_eq!(
            interview.search_url("计算机网络"),
            "https://mianshiya.com/search/all?searchText=%E8%AE%A1%E7%AE%97%E6%9C%BA%E7%BD%91%E7%BB%9C"
        );
    }

    #[test]
    fn existing_query_string_is_extended() {
        let tool = WebSearchTool::builder("t", "http://x/search?lang=en").build().unwrap();
        assert_eq!(tool.search_url("a&b"), "http://x/search?lang=en&q=a%26b");
    }

    #[test]
    fn invalid_selector_rejected() {
        let err = WebSearchTool::builder("t", "http://x").selector("<<").build().unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn extracts_trimmed_text_per_element() {
        let tool = WebSearchTool::builder("t", "http://x").selector(".ant-table-cell > a").build().unwrap();
        let html = r#"<table><tr>
            <td class="ant-table-cell"><a href="/q/1">  What is TCP?  </a></td>
            <td class="ant-table-cell"><span><a href="/q/x">nested, skipped</a></span></td>
            <td class="ant-table-cell"><a href="/q/2">Three-way
                handshake</a></td>
        </tr></table>"#;
        assert_eq!(tool.extract(html), "What is TCP?\nThree-way handshake");
    }

    #[test]
    fn schema_requires_keyword() {
        let tool = WebSearchTool::interview_questions().unwrap();
        let schema = tool.parameters_schema().unwrap();
        assert_eq!(schema["required"], json!(["keyword"]));
        assert_eq!(schema["properties"]["keyword"]["type"], "string");
    }
}
