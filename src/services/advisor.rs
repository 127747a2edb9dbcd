// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reduction tips and chat, backed by Gemini with rule-based fallbacks.
//!
//! The AI path is best-effort: any API failure degrades to the fallback
//! response instead of surfacing an error to the user.

use crate::models::{Category, EmissionSummary};
use serde::{Deserialize, Serialize};

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

const RECOMMENDATION_MAX_TOKENS: u32 = 1024;
const CHAT_MAX_TOKENS: u32 = 500;

const TRANSPORT_THRESHOLD_KG: f64 = 10.0;
const ENERGY_THRESHOLD_KG: f64 = 5.0;
const FOOD_THRESHOLD_KG: f64 = 5.0;

const CHAT_UNCONFIGURED_TEXT: &str = "I'm your carbon footprint assistant! To get AI-powered responses, please configure your Gemini API key. In the meantime, I can tell you that the average person's carbon footprint is about 4-8 tonnes CO2 per year. Reducing transport and food emissions usually has the biggest impact!";
const CHAT_EMPTY_TEXT: &str = "I couldn't generate a response. Please try again.";
const CHAT_FALLBACK_TEXT: &str = "I can help you reduce your carbon footprint! Here are some quick tips: Walk or bike for short trips, switch to LED bulbs, eat more plant-based meals, and reduce single-use plastics. Would you like more specific advice?";

/// Emission data handed to the advisor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionContext {
    #[serde(flatten)]
    pub summary: EmissionSummary,
    pub activity_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// A single rule-based tip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub category: String,
    pub tip: String,
    pub potential_saving: String,
}

impl Tip {
    fn new(category: &str, tip: &str, potential_saving: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            tip: tip.to_string(),
            potential_saving: potential_saving.into(),
        }
    }
}

/// Free-form AI text or a list of rule-based tips.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Recommendations {
    Text(String),
    Tips(Vec<Tip>),
}

/// Where an advisor response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdviceSource {
    Ai,
    RuleBased,
    Fallback,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationsResponse {
    pub success: bool,
    pub recommendations: Recommendations,
    pub source: AdviceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub source: AdviceSource,
}

/// Errors from the Gemini API. Never returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("Gemini request failed: {0}")]
    Request(String),

    #[error("Gemini HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to encode context: {0}")]
    Encode(#[from] serde_json::Error),
}

// ─── Gemini Client ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate, if non-empty.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: GEMINI_API_URL.to_string(),
            api_key,
        }
    }

    /// Generate text for a prompt. `Ok(None)` when the model returned nothing.
    pub async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<Option<String>, AdvisorError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status { status, body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Request(format!("JSON parse error: {}", e)))?;

        Ok(parsed.first_text())
    }
}

// ─── Advisor Service ────────────────────────────────────────────

/// Produces reduction tips and chat replies.
#[derive(Clone, Default)]
pub struct AdvisorService {
    gemini: Option<GeminiClient>,
}

impl AdvisorService {
    /// AI responses are enabled when an API key is given.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            gemini: api_key.map(GeminiClient::new),
        }
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.gemini.is_some()
    }

    /// Personalized recommendations, or an answer to `question` about the data.
    pub async fn recommendations(
        &self,
        context: &EmissionContext,
        question: Option<&str>,
    ) -> RecommendationsResponse {
        let Some(gemini) = &self.gemini else {
            return fallback_recommendations(&context.summary);
        };

        let result = match recommendation_prompt(context, question) {
            Ok(prompt) => gemini.generate(&prompt, RECOMMENDATION_MAX_TOKENS).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(text)) => RecommendationsResponse {
                success: true,
                recommendations: Recommendations::Text(text),
                source: AdviceSource::Ai,
                message: None,
            },
            Ok(None) => {
                tracing::warn!("Gemini returned no candidates, using rule-based tips");
                fallback_recommendations(&context.summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gemini request failed, using rule-based tips");
                fallback_recommendations(&context.summary)
            }
        }
    }

    /// Conversational reply with the user's recent emissions as context.
    pub async fn chat(&self, message: &str, context: &EmissionSummary) -> ChatResponse {
        let Some(gemini) = &self.gemini else {
            return ChatResponse {
                success: true,
                response: CHAT_UNCONFIGURED_TEXT.to_string(),
                source: AdviceSource::Fallback,
            };
        };

        match gemini.generate(&chat_prompt(message, context), CHAT_MAX_TOKENS).await {
            Ok(Some(text)) => ChatResponse {
                success: true,
                response: text,
                source: AdviceSource::Ai,
            },
            Ok(None) => ChatResponse {
                success: false,
                response: CHAT_EMPTY_TEXT.to_string(),
                source: AdviceSource::Error,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Gemini chat failed, using fallback reply");
                ChatResponse {
                    success: true,
                    response: CHAT_FALLBACK_TEXT.to_string(),
                    source: AdviceSource::Fallback,
                }
            }
        }
    }
}

fn recommendation_prompt(
    context: &EmissionContext,
    question: Option<&str>,
) -> Result<String, AdvisorError> {
    Ok(match question {
        Some(question) => format!(
            "Based on this carbon emission data: {}\n\nUser question: {}\n\nProvide helpful, actionable advice.",
            serde_json::to_string(context)?,
            question
        ),
        None => format!(
            "You are an expert environmental consultant. Analyze this carbon footprint data and provide personalized recommendations:\n\n\
             {}\n\n\
             Provide:\n\
             1. Top 3 areas for improvement based on the data\n\
             2. Specific actionable tips for each area\n\
             3. Estimated CO2 savings if tips are followed\n\n\
             Be encouraging, specific, and practical. Format your response clearly with sections.",
            serde_json::to_string_pretty(context)?
        ),
    })
}

fn chat_prompt(message: &str, context: &EmissionSummary) -> String {
    let by_category = serde_json::to_string(&context.by_category).unwrap_or_else(|_| "{}".into());
    format!(
        "You are a friendly and knowledgeable carbon footprint assistant. You help users understand their environmental impact and provide practical tips.\n\n\
         Be conversational, encouraging, and specific with advice. Keep responses concise (2-3 paragraphs max).\n\n\
         User's emission context (last 30 days): Total: {:.2} kg CO2. Categories: {}\n\n\
         User message: {}",
        context.total, by_category, message
    )
}

/// Rule-based tips from category subtotals.
pub fn fallback_recommendations(summary: &EmissionSummary) -> RecommendationsResponse {
    let mut tips = Vec::new();

    let transport = summary.category_total(Category::Transport);
    if transport > TRANSPORT_THRESHOLD_KG {
        tips.push(Tip::new(
            "Transport",
            "Consider carpooling or using public transport. Switching to public transit can reduce your transport emissions by up to 65%.",
            format!("{} kg CO2", (transport * 0.5).round()),
        ));
        tips.push(Tip::new(
            "Transport",
            "For short trips under 5km, try cycling or walking instead of driving.",
            "0.5-2 kg CO2 per trip",
        ));
    }

    let energy = summary.category_total(Category::Energy);
    if energy > ENERGY_THRESHOLD_KG {
        tips.push(Tip::new(
            "Energy",
            "Switch to LED bulbs and turn off lights when not in use. This can reduce home electricity by 10-20%.",
            format!("{} kg CO2", (energy * 0.15).round()),
        ));
        tips.push(Tip::new(
            "Energy",
            "Lower your thermostat by 1-2°C in winter and use fans instead of AC when possible.",
            "3-5% energy reduction",
        ));
    }

    if summary.category_total(Category::Food) > FOOD_THRESHOLD_KG {
        tips.push(Tip::new(
            "Food",
            "Try having one or two meatless days per week. Replacing beef with plant-based meals can save up to 5kg CO2 per meal.",
            "10-20 kg CO2 per week",
        ));
        tips.push(Tip::new(
            "Food",
            "Reduce food waste by planning meals and storing food properly. About 6% of global emissions come from food waste.",
            "1-2 kg CO2 per week",
        ));
    }

    if tips.is_empty() {
        tips.push(Tip::new(
            "General",
            "Great job tracking your carbon footprint! Keep logging activities to identify patterns and areas for improvement.",
            "Knowledge is power!",
        ));
        tips.push(Tip::new(
            "General",
            "Consider offsetting your emissions by supporting reforestation projects or renewable energy initiatives.",
            "Variable",
        ));
    }

    RecommendationsResponse {
        success: true,
        recommendations: Recommendations::Tips(tips),
        source: AdviceSource::RuleBased,
        message: Some("Showing rule-based suggestions based on your data.".to_string()),
    }
}
