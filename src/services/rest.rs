use reqwest::{Client, Response};
use serde::Deserialize;

use crate::{
    config::ClientConfig,
    dto::http::{HealthResponse, JoinRequest, JoinResponse, MarkCellRequest, MarkCellResponse,
        RoomStateResponse},
    error::{SyncError, SyncResult},
    words::WordGrid,
};

/// Request/response half of the transport adapter.
///
/// One logical action maps to one in-flight request; callers serialize
/// through the controller's gate. Every request carries the configured
/// connect and whole-request timeouts.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Build the underlying HTTP client with the configured timeouts.
    pub fn new(config: &ClientConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// `POST /api/join`: join or create the room for a meeting.
    pub async fn join(&self, meeting_id: &str, player_name: &str) -> SyncResult<JoinResponse> {
        let url = self.config.api_url("/api/join");
        let response = self
            .client
            .post(url)
            .json(&JoinRequest {
                meeting_id: meeting_id.to_string(),
                player_name: player_name.to_string(),
            })
            .send()
            .await?;

        Ok(expect_success(response).await?.json().await?)
    }

    /// `POST /api/room/{meeting_id}/player/{player_id}/words`: push the 5x5
    /// card so transcript-triggered marks can be attributed.
    pub async fn set_words(
        &self,
        meeting_id: &str,
        player_id: &str,
        grid: &WordGrid,
    ) -> SyncResult<()> {
        let url = self
            .config
            .api_url(&format!("/api/room/{meeting_id}/player/{player_id}/words"));
        let response = self.client.post(url).json(grid.rows()).send().await?;
        expect_success(response).await?;
        Ok(())
    }

    /// `POST /api/mark`: REST fallback for a cell mark when the persistent
    /// channel is down.
    pub async fn mark_cell(&self, request: &MarkCellRequest) -> SyncResult<MarkCellResponse> {
        let url = self.config.api_url("/api/mark");
        let response = self.client.post(url).json(request).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// `DELETE /api/room/{meeting_id}/player/{player_id}`: leave the room.
    pub async fn leave(&self, meeting_id: &str, player_id: &str) -> SyncResult<()> {
        let url = self
            .config
            .api_url(&format!("/api/room/{meeting_id}/player/{player_id}"));
        let response = self.client.delete(url).send().await?;
        expect_success(response).await?;
        Ok(())
    }

    /// `GET /api/room/{meeting_id}`: full room snapshot.
    pub async fn room_state(&self, meeting_id: &str) -> SyncResult<RoomStateResponse> {
        let url = self.config.api_url(&format!("/api/room/{meeting_id}"));
        let response = self.client.get(url).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }

    /// `GET /health`: server liveness and room count.
    pub async fn health(&self) -> SyncResult<HealthResponse> {
        let url = self.config.api_url("/health");
        let response = self.client.get(url).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

/// Body shape the server uses for error responses; FastAPI-style services
/// put the text under `detail`, others under `message`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

/// Map a non-2xx response to [`SyncError::Server`], pulling the message out
/// of the body when one is present.
async fn expect_success(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&raw)
        .ok()
        .and_then(|body| body.message.or(body.detail))
        .unwrap_or(raw);

    Err(SyncError::Server {
        status: status.as_u16(),
        message,
    })
}
