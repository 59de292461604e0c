use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ClientCommand, MonitorError, ServerEvent};
use crate::services::broadcast::BatchReceiver;
use crate::services::monitor::LinkMonitorService;

/// Adapter between one live connection and the shared monitor. Holds no
/// targets of its own, only its visibility and its broadcast subscription.
pub struct MonitorSession {
    id: Uuid,
    monitor: LinkMonitorService,
    visible: bool,
    batches: BatchReceiver,
}

impl MonitorSession {
    pub fn new(monitor: LinkMonitorService) -> Self {
        let batches = monitor.subscribe();
        Self {
            id: Uuid::new_v4(),
            monitor,
            visible: false,
            batches,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub async fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::StartMonitoring => {
                self.visible = true;
                self.monitor.start().await;
            }
            ClientCommand::StopMonitoring => {
                self.visible = false;
                self.monitor.stop().await;
            }
            ClientCommand::UpdateLinks(targets) => {
                debug!("Session {} updated links: {}", self.id, targets.len());
                self.monitor.update_targets(targets).await;
            }
        }
    }

    pub async fn handle_text(&mut self, text: &str) -> Result<(), MonitorError> {
        let command: ClientCommand = serde_json::from_str(text)
            .map_err(|e| MonitorError::InvalidCommand(e.to_string()))?;
        self.handle_command(command).await;
        Ok(())
    }

    /// Next batch as an outbound event. Batches missed by a slow session are
    /// skipped. `None` once the monitor is gone.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        loop {
            match self.batches.recv().await {
                Ok(batch) => return Some(ServerEvent::LatencyUpdate(batch.results.clone())),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Session {} lagging, skipped {} batches", self.id, missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn render_event(event: &ServerEvent) -> Result<String, MonitorError> {
        Ok(serde_json::to_string(event)?)
    }

    /// Drives the connection until the client leaves. Disconnecting never
    /// touches the monitor's running state.
    pub async fn run(mut self, socket: WebSocket) {
        let (mut sender, mut receiver) = socket.split();
        info!("Monitor session {} connected", self.id);

        loop {
            tokio::select! {
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = self.handle_text(text.as_str()).await {
                            warn!("Session {} sent an unusable frame: {}", self.id, e);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Session {} receive failed: {}", self.id, e);
                        break;
                    }
                },
                event = self.next_event() => match event {
                    Some(event) => {
                        if let Err(e) = Self::send_event(&mut sender, &event).await {
                            error!("Session {} send failed: {}", self.id, e);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        info!("Monitor session {} disconnected", self.id);
    }

    async fn send_event(
        sender: &mut SplitSink<WebSocket, Message>,
        event: &ServerEvent,
    ) -> Result<(), MonitorError> {
        let text = Self::render_event(event)?;
        sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))
    }
}
