use std::net::SocketAddr;

use parse_display::Display;
use thiserror::Error;
use validator::Validate;

use crate::{
    global::Global,
    grid::GridError,
    instance::{InstanceHandle, InstanceHandleError},
};

/// Schema definitions as Serde serializable structures and enums
pub mod message;
use message::{DeviceInfo, GridInfo, LedRequest, LedResponse};

#[derive(Debug, Error)]
pub enum JsonApiError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("malformed payload: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("error accessing the LED controller: {0}")]
    Instance(#[from] InstanceHandleError),
}

impl JsonApiError {
    /// true if the request was rejected, false if the daemon failed handling it
    pub fn is_rejection(&self) -> bool {
        !matches!(self, JsonApiError::Instance(_))
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientName {
    #[display("JSON({peer_addr})")]
    Json { peer_addr: SocketAddr },
    #[display("HTTP({peer_addr})")]
    Http { peer_addr: SocketAddr },
    #[display("local")]
    Local,
}

/// A client connected to one of the JSON endpoints
#[derive(Debug)]
pub struct ClientConnection {
    name: ClientName,
}

impl ClientConnection {
    pub fn new(name: ClientName) -> Self {
        Self { name }
    }

    #[instrument(skip(request, global))]
    pub async fn handle_request(
        &mut self,
        request: LedRequest,
        global: &Global,
    ) -> Result<LedResponse, JsonApiError> {
        request.validate()?;

        let instance = global.instance().await;

        Ok(match request {
            LedRequest::Highlight(highlight) => {
                let duration = highlight.duration;
                let outcome = instance.highlight(highlight.into()).await??;

                LedResponse::highlight(outcome.indices.len(), duration, outcome.color)
            }

            LedRequest::TurnOffAll => LedResponse::turn_off_all(instance.turn_off_all().await?),

            LedRequest::Status => self.status(&instance, global).await?,
        })
    }

    async fn status(
        &self,
        instance: &InstanceHandle,
        global: &Global,
    ) -> Result<LedResponse, JsonApiError> {
        let status = instance.status().await?;
        let name = global.read_config(|config| config.general.name.clone()).await;

        Ok(LedResponse::status(
            DeviceInfo::new(name, status.device),
            status.scheduler.led_count,
            status.scheduler.active_leds,
            status.brightness,
            GridInfo {
                rows: status.scheduler.grid.rows(),
                columns: status.scheduler.grid.columns(),
            },
            status.uptime.as_secs(),
        ))
    }

    /// Parse and handle a raw payload
    ///
    /// Errors are returned alongside their response so that transports can pick a status.
    pub async fn handle_payload(
        &mut self,
        payload: &[u8],
        global: &Global,
    ) -> Result<LedResponse, (JsonApiError, LedResponse)> {
        let result = match message::parse_request(payload) {
            Ok(request) => {
                trace!(client = %self.name, request = ?request, "processing request");
                self.handle_request(request, global).await
            }
            Err(error) => Err(error),
        };

        result.map_err(|error| {
            if error.is_rejection() {
                debug!(client = %self.name, error = %error, "rejected request");
            } else {
                warn!(client = %self.name, error = %error, "failed handling request");
            }

            let response = LedResponse::error(&error);
            (error, response)
        })
    }
}
