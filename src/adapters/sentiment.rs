//! Sentiment Analyst
//!
//! Asks an OpenAI-compatible chat-completions endpoint (x.ai Grok) for
//! real-time social sentiment on a token. Without an API key, or with
//! auto-trade off, a mock analysis keeps dry runs flowing end to end.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("API returned error: {0}")]
    RemoteError(String),

    #[error("Empty completion")]
    EmptyCompletion,
}

/// The analyst's verdict on a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentReport {
    /// 0-100, higher is more bullish
    pub score: f64,
    /// BULLISH | BEARISH | SCAM | NEUTRAL | UNCERTAIN
    pub verdict: String,
    pub summary: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
    stream: bool,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Sentiment client
#[derive(Clone)]
pub struct SentimentAnalyst {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    /// Mock mode when false: no live API calls
    live: bool,
}

impl SentimentAnalyst {
    pub fn new(api_url: String, model: String, api_key: Option<String>, auto_trade: bool) -> Self {
        let live = api_key.is_some() && auto_trade;
        Self {
            http: reqwest::Client::new(),
            api_url,
            model,
            api_key,
            live,
        }
    }

    /// Analyze sentiment for a token; mock mode returns a simulated report
    pub async fn analyze(&self, symbol: &str, name: &str) -> Result<SentimentReport, SentimentError> {
        if !self.live {
            tracing::info!("Mock sentiment analysis for ${symbol} ({name})");
            let score = rand::thread_rng().gen_range(60..=100) as f64;
            let verdict = if score > 75.0 { "BULLISH" } else { "NEUTRAL" };
            return Ok(SentimentReport {
                score,
                verdict: verdict.to_string(),
                summary: "Mock analysis: narrative velocity looks organic in simulation."
                    .to_string(),
            });
        }

        tracing::info!("Requesting sentiment intelligence on ${symbol}");
        let query = format!(
            "Analyze the current real-time sentiment on X (Twitter) for the crypto token \
             ${symbol} ({name}).\nFocus on:\n1. Is there real organic discussion or just bot \
             spam?\n2. Are there any key influencers (KOLs) mentioning it?\n3. What is the \
             'Narrative Velocity' (is it heating up or cooling down)?\n\nReturn a JSON object \
             with: {{ \"score\": 0-100, \"verdict\": \"BULLISH\"|\"BEARISH\"|\"SCAM\"|\
             \"NEUTRAL\", \"summary\": \"short reason\" }}"
        );

        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a high-frequency trading intelligence analyst. You are \
                              concise, cynical, and data-driven."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            model: &self.model,
            stream: false,
            temperature: 0.1,
        };

        let mut request = self.http.post(&self.api_url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = request
            .send()
            .await
            .map_err(|e| SentimentError::ApiError(e.to_string()))?
            .json()
            .await
            .map_err(|e| SentimentError::ApiError(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(SentimentError::RemoteError(err.to_string()));
        }

        let content = response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or(SentimentError::EmptyCompletion)?;

        Ok(parse_report(&content))
    }
}

/// Extract the report JSON from a completion. The model may wrap the object
/// in markdown; a reply with no parseable object becomes UNCERTAIN at
/// score 50 so the gate still has something to compare.
pub fn parse_report(content: &str) -> SentimentReport {
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(report) = serde_json::from_str::<SentimentReport>(&content[start..=end]) {
                tracing::info!("Sentiment verdict: {} (score {})", report.verdict, report.score);
                return report;
            }
        }
    }
    SentimentReport {
        score: 50.0,
        verdict: "UNCERTAIN".to_string(),
        summary: content.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json_report() {
        let report = parse_report(r#"{"score": 85, "verdict": "BULLISH", "summary": "ok"}"#);
        assert_eq!(report.verdict, "BULLISH");
        assert!((report.score - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_markdown_wrapped_report() {
        let content = "Here is my analysis:\n```json\n{\"score\": 30, \"verdict\": \"SCAM\", \
                       \"summary\": \"bot spam\"}\n```\nStay safe.";
        let report = parse_report(content);
        assert_eq!(report.verdict, "SCAM");
        assert!((report.score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_reply_is_uncertain() {
        let report = parse_report("I cannot find anything about this token.");
        assert_eq!(report.verdict, "UNCERTAIN");
        assert!((report.score - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_mock_mode_scores_in_band() {
        let analyst = SentimentAnalyst::new(
            "https://api.x.ai/v1/chat/completions".to_string(),
            "grok-beta".to_string(),
            None,
            false,
        );
        for _ in 0..10 {
            let report = analyst.analyze("APE", "Ape Coin").await.unwrap();
            assert!((60.0..=100.0).contains(&report.score));
            assert!(report.verdict == "BULLISH" || report.verdict == "NEUTRAL");
        }
    }
}
