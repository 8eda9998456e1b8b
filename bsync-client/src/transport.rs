//! HTTP transport
//!
//! Requests go out as JSON POSTs carrying the connection id from `CONNECTED`;
//! room messages come back on a long-lived SSE response. Fire-and-forget
//! submissions share one worker task so the room sees them in order.

use crate::drag::RequestSink;
use crate::error::{Error, Result};
use crate::sse::{SseDecoder, SseFrame};
use bsync_common::{ClientRequest, ConnectionId, QueueEntryState, RoomId, ServerMessage};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const CONNECTION_ID_HEADER: &str = "x-connection-id";

#[derive(Debug, Deserialize)]
struct QueueResponse {
    entries: Vec<QueueEntryState>,
}

/// Where and as whom requests are sent
#[derive(Debug, Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    room_id: RoomId,
    connection_id: Arc<Mutex<Option<ConnectionId>>>,
}

impl Endpoint {
    fn room_url(&self, path: &str) -> String {
        format!("{}/api/rooms/{}/{}", self.base_url, self.room_id, path)
    }

    fn connection_id(&self) -> Option<ConnectionId> {
        match self.connection_id.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    async fn post(&self, request: &ClientRequest) -> Result<()> {
        let connection_id = self.connection_id().ok_or(Error::NotConnected)?;
        let response = self
            .client
            .post(self.room_url("messages"))
            .header(CONNECTION_ID_HEADER, connection_id.to_string())
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Cheap to clone; clones share the connection id and the outbound queue
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Endpoint,
    /// Submitted requests, posted one at a time by a single worker task
    outbound: Arc<OnceLock<mpsc::UnboundedSender<ClientRequest>>>,
}

impl HttpTransport {
    pub fn new(base_url: &str, room_id: RoomId) -> Self {
        Self {
            endpoint: Endpoint {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                room_id,
                connection_id: Arc::new(Mutex::new(None)),
            },
            outbound: Arc::new(OnceLock::new()),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.endpoint.room_id
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.endpoint.connection_id()
    }

    pub fn set_connection_id(&self, id: ConnectionId) {
        match self.endpoint.connection_id.lock() {
            Ok(mut guard) => *guard = Some(id),
            Err(poisoned) => *poisoned.into_inner() = Some(id),
        }
    }

    /// Join the room; the stream starts with `CONNECTED` and a snapshot
    pub async fn open_events(&self, client_name: Option<&str>) -> Result<EventStream> {
        let mut request = self.endpoint.client.get(self.endpoint.room_url("events"));
        if let Some(name) = client_name {
            request = request.query(&[("clientName", name)]);
        }

        let response = check(request.send().await?).await?;
        debug!(room_id = %self.endpoint.room_id, "Event stream open");
        Ok(EventStream::new(response))
    }

    /// POST a request and wait for the server to accept it
    pub async fn send(&self, request: &ClientRequest) -> Result<()> {
        self.endpoint.post(request).await
    }

    pub async fn queue(&self) -> Result<Vec<QueueEntryState>> {
        let url = self.endpoint.room_url("queue");
        let response = check(self.endpoint.client.get(url).send().await?).await?;
        let body: QueueResponse = response.json().await?;
        Ok(body.entries)
    }

    fn outbound(&self) -> Option<&mpsc::UnboundedSender<ClientRequest>> {
        if let Some(sender) = self.outbound.get() {
            return Some(sender);
        }
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        Some(self.outbound.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(drain_outbound(self.endpoint.clone(), rx));
            tx
        }))
    }
}

impl RequestSink for HttpTransport {
    /// Fire-and-forget: the outcome arrives on the event stream
    ///
    /// Requests reach the server in submission order.
    fn submit(&self, request: ClientRequest) {
        let Some(sender) = self.outbound() else {
            warn!(kind = request.kind(), "No runtime, dropping request");
            return;
        };
        if let Err(mpsc::error::SendError(request)) = sender.send(request) {
            warn!(kind = request.kind(), "Outbound worker stopped, dropping request");
        }
    }
}

/// Post queued requests sequentially until every transport clone is gone
async fn drain_outbound(endpoint: Endpoint, mut requests: mpsc::UnboundedReceiver<ClientRequest>) {
    while let Some(request) = requests.recv().await {
        if let Err(e) = endpoint.post(&request).await {
            warn!(kind = request.kind(), "Request failed: {}", e);
        }
    }
    debug!(room_id = %endpoint.room_id, "Outbound queue closed");
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decoded server messages from an SSE response
pub struct EventStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    ready: VecDeque<SseFrame>,
}

impl EventStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
        }
    }

    /// Next message; `None` when the server ends the stream
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                let message: ServerMessage = serde_json::from_str(&frame.data)?;
                return Ok(Some(message));
            }
            match self.response.chunk().await? {
                Some(chunk) => self.ready.extend(self.decoder.push(&chunk)),
                None => return Ok(None),
            }
        }
    }
}
