use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerEvent, ServerMessage, ABNORMAL_CLOSE};
use crate::gateway::TokenGrant;

/// Bidirectional realtime connection to the AI endpoint.
///
/// Owns a writer task draining outbound messages into the socket and a
/// reader task flattening inbound envelopes into [`ServerEvent`]s. Dropping
/// every outbound sender (the one held here plus any clones) shuts the
/// writer down, which closes the socket with code 1000.
pub struct RealtimeConnection {
    outbound: mpsc::Sender<ClientMessage>,
    reader_task: JoinHandle<()>,
}

impl RealtimeConnection {
    /// Open the socket, send the session setup, and wire up both tasks.
    ///
    /// Returns the connection and the event stream the controller consumes.
    pub async fn connect(
        url: &str,
        grant: &TokenGrant,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        let endpoint = format!("{}?access_token={}", url, grant.token);

        let (socket, _response) = connect_async(endpoint.as_str())
            .await
            .context("failed to open realtime connection")?;

        info!("realtime connection open: {}", url);

        let (mut sink, mut stream) = socket.split();

        let setup = ClientMessage::setup(grant.model.as_str(), grant.system_instruction.as_str());
        let setup_json =
            serde_json::to_string(&setup).context("failed to serialize session setup")?;
        sink.send(Message::Text(setup_json))
            .await
            .context("failed to send session setup")?;

        let (outbound, mut outbound_rx) = mpsc::channel::<ClientMessage>(32);
        let (events_tx, events_rx) = mpsc::channel::<ServerEvent>(64);

        // Detached on purpose: the writer lives exactly as long as there are
        // outbound senders, then closes the socket and exits.
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to serialize outbound message: {}", e);
                        continue;
                    }
                };

                if let Err(e) = sink.send(Message::Text(json)).await {
                    debug!("realtime write failed, stopping writer: {}", e);
                    return;
                }
            }

            // All senders dropped: clean shutdown.
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "session ended".into(),
            }));
            if let Err(e) = sink.send(close).await {
                debug!("realtime close failed: {}", e);
            }
            debug!("realtime writer stopped");
        });

        let reader_task = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(message) => {
                                for event in message.into_events() {
                                    if events_tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => warn!("unparseable realtime message, dropping: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
                            None => (ABNORMAL_CLOSE, "connection closed without reason".into()),
                        };
                        let _ = events_tx.send(ServerEvent::Closed { code, reason }).await;
                        return;
                    }
                    Some(Ok(_)) => {
                        // Binary/ping/pong frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        // Socket died without a close handshake; surface it the
                        // way a browser would, as an abnormal 1006 close.
                        error!("realtime read error: {}", e);
                        let _ = events_tx
                            .send(ServerEvent::Closed {
                                code: ABNORMAL_CLOSE,
                                reason: e.to_string(),
                            })
                            .await;
                        return;
                    }
                    None => {
                        let _ = events_tx
                            .send(ServerEvent::Closed {
                                code: ABNORMAL_CLOSE,
                                reason: "connection lost".into(),
                            })
                            .await;
                        return;
                    }
                }
            }
        });

        Ok((
            Self {
                outbound,
                reader_task,
            },
            events_rx,
        ))
    }

    /// Sender the capture pipeline writes frames into.
    pub fn sender(&self) -> mpsc::Sender<ClientMessage> {
        self.outbound.clone()
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        // The writer shuts down on its own once every sender is gone; the
        // reader is tied to the socket. Abort the reader so a dropped
        // connection never leaks a task.
        self.reader_task.abort();
    }
}
