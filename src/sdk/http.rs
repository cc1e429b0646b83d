use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::sdk::GatewayConfig;
use crate::{Entity, Error, Gateway, Result};

/// JSON-over-HTTP gateway for one REST resource.
///
/// Routes, relative to the configured base URL:
/// `GET /{resource}`, `GET /{resource}/{id}`, `POST /{resource}`,
/// `PUT /{resource}/{id}`, `DELETE /{resource}/{id}` and
/// `DELETE /{resource}/delete-many` with a JSON array of ids as body.
pub struct HttpGateway<T> {
    client: Client,
    base_url: String,
    token: Option<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> HttpGateway<T> {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    /// Shares an existing `reqwest::Client` (and its connection pool).
    pub fn with_client(client: Client, config: &GatewayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            _entity: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, T::RESOURCE)
    }

    fn item_url(&self, id: &T::Id) -> String {
        format!("{}/{}/{}", self.base_url, T::RESOURCE, id)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn send_json<R: DeserializeOwned>(&self, req: RequestBuilder) -> Result<R> {
        let bytes = self
            .send(req)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Maps a non-success response to the error taxonomy.
///
/// 400 and 422 are validation failures; their `errors` object, when present,
/// becomes the per-field detail. The message is taken from the body's
/// `message` (or `error`) field, then the raw body, then the status reason.
pub fn error_from_response(status: StatusCode, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_field = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = match from_field {
        Some(m) => m,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation {
            message,
            fields: parsed.as_ref().map(field_errors).unwrap_or_default(),
        },
        _ => Error::Server {
            status: status.as_u16(),
            message,
        },
    }
}

fn field_errors(body: &Value) -> HashMap<String, Vec<String>> {
    let Some(errors) = body.get("errors").and_then(Value::as_object) else {
        return HashMap::new();
    };
    errors
        .iter()
        .map(|(field, detail)| {
            let messages = match detail {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                other => vec![other.to_string()],
            };
            (field.clone(), messages)
        })
        .collect()
}

#[async_trait]
impl<T: Entity> Gateway<T> for HttpGateway<T> {
    async fn list(&self) -> Result<Vec<T>> {
        self.send_json(self.client.get(self.collection_url())).await
    }

    async fn get(&self, id: &T::Id) -> Result<T> {
        self.send_json(self.client.get(self.item_url(id))).await
    }

    async fn create(&self, data: &T::Data) -> Result<T> {
        self.send_json(self.client.post(self.collection_url()).json(data))
            .await
    }

    async fn update(&self, id: &T::Id, data: &T::Data) -> Result<T> {
        self.send_json(self.client.put(self.item_url(id)).json(data))
            .await
    }

    async fn delete(&self, id: &T::Id) -> Result<()> {
        self.send(self.client.delete(self.item_url(id))).await?;
        Ok(())
    }

    async fn delete_many(&self, ids: &[T::Id]) -> Result<()> {
        let url = format!("{}/delete-many", self.collection_url());
        self.send(self.client.delete(url).json(ids)).await?;
        Ok(())
    }
}
