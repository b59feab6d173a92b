use async_trait::async_trait;
use dice::{
    NewQuickRoll, ObjectId, QuickRoll, QuickRollPatch, Roll,
    payloads::{
        ClearResponse, CreateQuickRollBody, ErrorBody, HistoryResponse, MessageResponse,
        QuickRollEnvelope, QuickRollList, SaveRollBody, UpdateQuickRollBody,
    },
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;

/// Quick roll endpoints, the seam the hook is written against.
#[async_trait]
pub trait QuickRollApi: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<QuickRoll>, ClientError>;

    async fn create(&self, user_id: &str, fields: &NewQuickRoll) -> Result<QuickRoll, ClientError>;

    async fn update(
        &self,
        user_id: &str,
        id: &ObjectId,
        patch: &QuickRollPatch,
    ) -> Result<QuickRoll, ClientError>;

    async fn delete(&self, user_id: &str, id: &ObjectId) -> Result<(), ClientError>;
}

#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn save_roll(&self, body: &SaveRollBody) -> Result<Roll, ClientError> {
        send(self.client.post(self.url("/rolls/save")).json(body)).await
    }

    pub async fn history(
        &self,
        user_id: Option<&str>,
        limit: usize,
    ) -> Result<HistoryResponse, ClientError> {
        let mut request = self
            .client
            .get(self.url("/rolls/history"))
            .query(&[("limit", limit.to_string())]);
        if let Some(user_id) = user_id {
            request = request.query(&[("userId", user_id)]);
        }

        send(request).await
    }

    pub async fn clear_rolls(
        &self,
        user_id: Option<&str>,
        all: bool,
    ) -> Result<ClearResponse, ClientError> {
        let mut request = self.client.delete(self.url("/rolls/clear"));
        if let Some(user_id) = user_id {
            request = request.query(&[("userId", user_id)]);
        }
        if all {
            request = request.query(&[("all", "true")]);
        }

        send(request).await
    }
}

#[async_trait]
impl QuickRollApi for HttpApi {
    async fn list(&self, user_id: &str) -> Result<Vec<QuickRoll>, ClientError> {
        let request = self
            .client
            .get(self.url("/quick-rolls"))
            .query(&[("userId", user_id)]);

        let list: QuickRollList = send(request).await?;
        Ok(list.data)
    }

    async fn create(&self, user_id: &str, fields: &NewQuickRoll) -> Result<QuickRoll, ClientError> {
        let request = self
            .client
            .post(self.url("/quick-rolls"))
            .query(&[("userId", user_id)])
            .json(&CreateQuickRollBody::from(fields));

        let envelope: QuickRollEnvelope = send(request).await?;
        Ok(envelope.data)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &ObjectId,
        patch: &QuickRollPatch,
    ) -> Result<QuickRoll, ClientError> {
        let request = self
            .client
            .put(self.url(&format!("/quick-rolls/{id}")))
            .query(&[("userId", user_id)])
            .json(&UpdateQuickRollBody::from(patch));

        let envelope: QuickRollEnvelope = send(request).await?;
        Ok(envelope.data)
    }

    async fn delete(&self, user_id: &str, id: &ObjectId) -> Result<(), ClientError> {
        let request = self
            .client
            .delete(self.url(&format!("/quick-rolls/{id}")))
            .query(&[("userId", user_id)]);

        let _: MessageResponse = send(request).await?;
        Ok(())
    }
}

/// Non-2xx answers become [`ClientError::Api`] carrying the server's message,
/// or the status text when the body is not an error body.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    debug!("{} {status}", response.url());

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
