//! Ollama integration for natural-language basal queries.
//!
//! A question is answered in two round trips: the model first translates it
//! into a single SQLite `SELECT`, and after the caller runs that query the
//! model summarizes the rendered result table.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default Ollama server address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
/// Default model name.
pub const DEFAULT_MODEL: &str = "mistral";
const CHAT_PATH: &str = "/api/chat";

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The configured endpoint was unusable.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Ollama chat client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    chat_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("chat_url", &self.chat_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the Ollama server at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is blank or not an `http(s)` URL, or
    /// if the HTTP client fails to build.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LlmError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(LlmError::InvalidEndpoint {
                reason: "endpoint cannot be empty",
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(LlmError::InvalidEndpoint {
                reason: "endpoint must start with http:// or https://",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            chat_url: format!("{endpoint}{CHAT_PATH}"),
        })
    }

    /// Asks the model to translate `question` into one SQLite query over `schema`.
    pub async fn generate_sql(
        &self,
        model: &str,
        question: &str,
        schema: &str,
    ) -> Result<String, LlmError> {
        let reply = self.chat(model, build_sql_prompt(question, schema)).await?;
        let sql = extract_sql(&reply);
        if sql.is_empty() {
            return Err(LlmError::InvalidResponse(
                "model returned no SQL".to_string(),
            ));
        }
        tracing::debug!(%sql, "generated query");
        Ok(sql)
    }

    /// Asks the model to answer `question` from a rendered result table.
    pub async fn interpret(
        &self,
        model: &str,
        question: &str,
        table: &str,
    ) -> Result<String, LlmError> {
        let reply = self
            .chat(model, build_interpretation_prompt(question, table))
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn chat(&self, model: &str, prompt: String) -> Result<String, LlmError> {
        let request = ChatRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        tracing::debug!(url = %self.chat_url, model, "sending chat request");
        let response = self.http.post(&self.chat_url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        Ok(payload.message.content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error,
        })
}

fn build_sql_prompt(question: &str, schema: &str) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You are an SQL expert. Convert the natural language question below into a single SQLite query."
            .to_string(),
    );
    lines.push("Database schema:".to_string());
    lines.push(schema.trim().to_string());
    lines.push(String::new());
    lines.push("Rules:".to_string());
    lines.push("- Return ONLY the SQL query, with no explanation or markdown.".to_string());
    lines.push("- The query must start with SELECT (or WITH) and must not modify data.".to_string());
    lines.push("- Dates are YYYY-MM-DD text; use date('now') for today.".to_string());
    lines.push("- Times are HH:MM text; an end_time of 00:00 means midnight at the end of the day.".to_string());
    lines.push("- Keep the query as simple as the question allows.".to_string());
    lines.push(String::new());
    lines.push("Examples:".to_string());
    lines.push("- \"which day has the greatest total\":".to_string());
    lines.push(
        "  SELECT date, total_units FROM basal_schedules ORDER BY total_units DESC LIMIT 1"
            .to_string(),
    );
    lines.push("- \"what was my basal rate on Dec 2, 2023\":".to_string());
    lines.push("  SELECT i.start_time, i.end_time, i.units_per_hour FROM basal_schedules s JOIN basal_intervals i ON i.schedule_id = s.id WHERE s.date = '2023-12-02' ORDER BY i.start_time".to_string());
    lines.push(String::new());
    lines.push(format!("Question: {}", question.trim()));
    lines.join("\n")
}

fn build_interpretation_prompt(question: &str, table: &str) -> String {
    let mut lines = Vec::new();
    lines.push(
        "You are a helpful assistant that interprets SQL query results about insulin basal rates."
            .to_string(),
    );
    lines.push(format!("The user asked: {}", question.trim()));
    lines.push(String::new());
    lines.push("Query results:".to_string());
    if table.trim().is_empty() {
        lines.push("(no rows)".to_string());
    } else {
        lines.push(table.trim_end().to_string());
    }
    lines.push(String::new());
    lines.push(
        "Answer the question clearly and briefly, using only these results.".to_string(),
    );
    lines.join("\n")
}

/// Pulls the SQL statement out of a model reply.
///
/// Models often wrap the query in a markdown fence despite instructions, so
/// the first fenced block wins when present.
pub fn extract_sql(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(fence_start) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    let after_fence = &trimmed[fence_start + 3..];
    // Drop an info string such as `sql` on the opening fence line.
    let body = after_fence
        .split_once('\n')
        .map_or(after_fence, |(_, rest)| rest);
    let body = body.split_once("```").map_or(body, |(inner, _)| inner);
    body.trim().to_string()
}
