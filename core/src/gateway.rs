//! Stateless translation between question operations and HTTP exchanges.
//!
//! # Design
//! `QuestionGateway` holds a base URL and a `Transport`, and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that validates the endpoint and encodes the payload, and a
//! `parse_*` method that decodes the response. The async operations chain
//! `build_*`, one `Transport::execute`, and `parse_*`, so endpoint and
//! encoding failures are reported before any I/O is attempted.

use std::collections::HashSet;

use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::error::GatewayError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{Question, QuestionId};

/// Client for the remote question collection.
#[derive(Debug, Clone)]
pub struct QuestionGateway<T> {
    base_url: String,
    transport: T,
}

impl<T> QuestionGateway<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_list(&self) -> Result<HttpRequest, GatewayError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.collection_url()?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_get(&self, id: QuestionId) -> Result<HttpRequest, GatewayError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.item_url(id)?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_create(&self, draft: &Question) -> Result<HttpRequest, GatewayError> {
        let url = self.collection_url()?;
        let body = encode(draft)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: json_headers(),
            body: Some(body),
        })
    }

    /// Only persisted questions can be updated; a draft fails before any I/O.
    pub fn build_update(&self, question: &Question) -> Result<HttpRequest, GatewayError> {
        if !question.is_persisted() {
            return Err(GatewayError::EncodeFailure(format!(
                "question id {} has not been persisted",
                question.id
            )));
        }
        let url = self.item_url(question.id)?;
        let body = encode(question)?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url,
            headers: json_headers(),
            body: Some(body),
        })
    }

    pub fn build_delete(&self, id: QuestionId) -> Result<HttpRequest, GatewayError> {
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: self.item_url(id)?,
            headers: Vec::new(),
            body: None,
        })
    }

    /// Every listed question must carry a positive id, and no id may repeat.
    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<Question>, GatewayError> {
        let status = response.status;
        let questions: Vec<Question> = decode(response)?;
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            check_persisted(status, question)?;
            if !seen.insert(question.id) {
                return Err(GatewayError::InvalidResponse {
                    status,
                    reason: format!("question id {} listed more than once", question.id),
                });
            }
        }
        Ok(questions)
    }

    /// Shared by get, create and update, which all answer with one persisted
    /// question.
    pub fn parse_question(&self, response: HttpResponse) -> Result<Question, GatewayError> {
        let status = response.status;
        let question: Question = decode(response)?;
        check_persisted(status, &question)?;
        Ok(question)
    }

    /// Delete succeeds whenever a response arrived; status and body are not
    /// inspected.
    pub fn parse_delete(&self, _response: HttpResponse) -> Result<(), GatewayError> {
        Ok(())
    }

    fn collection_url(&self) -> Result<String, GatewayError> {
        self.endpoint("questions/")
    }

    fn item_url(&self, id: QuestionId) -> Result<String, GatewayError> {
        self.endpoint(&format!("questions/{id}"))
    }

    fn endpoint(&self, path: &str) -> Result<String, GatewayError> {
        let raw = format!("{}/{path}", self.base_url);
        let url = Url::parse(&raw)
            .map_err(|e| GatewayError::InvalidEndpoint(format!("{raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url.into()),
            other => Err(GatewayError::InvalidEndpoint(format!(
                "{raw}: unsupported scheme `{other}`"
            ))),
        }
    }
}

impl<T: Transport> QuestionGateway<T> {
    pub async fn list(&self) -> Result<Vec<Question>, GatewayError> {
        let request = self.build_list()?;
        let response = self.transport.execute(request).await?;
        self.parse_list(response)
    }

    pub async fn get(&self, id: QuestionId) -> Result<Question, GatewayError> {
        let request = self.build_get(id)?;
        let response = self.transport.execute(request).await?;
        self.parse_question(response)
    }

    pub async fn create(&self, draft: &Question) -> Result<Question, GatewayError> {
        let request = self.build_create(draft)?;
        let response = self.transport.execute(request).await?;
        self.parse_question(response)
    }

    pub async fn update(&self, question: &Question) -> Result<Question, GatewayError> {
        let request = self.build_update(question)?;
        let response = self.transport.execute(request).await?;
        self.parse_question(response)
    }

    pub async fn delete(&self, id: QuestionId) -> Result<(), GatewayError> {
        let request = self.build_delete(id)?;
        let response = self.transport.execute(request).await?;
        self.parse_delete(response)
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn encode(question: &Question) -> Result<String, GatewayError> {
    question
        .validate()
        .map_err(|e| GatewayError::EncodeFailure(e.to_string()))?;
    serde_json::to_string(question).map_err(|e| GatewayError::EncodeFailure(e.to_string()))
}

fn check_persisted(status: u16, question: &Question) -> Result<(), GatewayError> {
    if question.is_persisted() {
        return Ok(());
    }
    Err(GatewayError::InvalidResponse {
        status,
        reason: format!("question without a server id ({})", question.id),
    })
}

fn decode<D: DeserializeOwned>(response: HttpResponse) -> Result<D, GatewayError> {
    let status = response.status;
    if !response.is_success() {
        return Err(GatewayError::InvalidResponse {
            status,
            reason: format!("unexpected status, body: {}", response.body),
        });
    }
    if response.body.trim().is_empty() {
        return Err(GatewayError::InvalidResponse {
            status,
            reason: "empty body".to_string(),
        });
    }
    serde_json::from_str(&response.body).map_err(|e| GatewayError::InvalidResponse {
        status,
        reason: e.to_string(),
    })
}
