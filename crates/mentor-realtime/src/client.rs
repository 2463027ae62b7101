use crate::types;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use mentor_realtime_types::audio::Base64EncodedAudioBytes;
use tokio_tungstenite::tungstenite::Message;

mod config;
mod consts;
mod utils;

pub use config::{Config, ConfigBuilder};

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientMessage>;
type EventTx = tokio::sync::broadcast::Sender<types::LiveEvent>;
pub type EventRx = tokio::sync::broadcast::Receiver<types::LiveEvent>;

/// Connection to the live mentor API. Outbound messages go through a
/// buffered channel drained by a writer task; inbound frames are parsed
/// and broadcast as [`types::LiveEvent`]s by a reader task.
pub struct Client {
    capacity: usize,
    config: config::Config,
    c_tx: Option<ClientTx>,
    e_tx: Option<EventTx>,
}

impl Client {
    fn new(capacity: usize, config: config::Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            e_tx: None,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let request = utils::build_request(&self.config)?;
        let (mut ws_stream, _) = tokio_tungstenite::connect_async(request).await?;

        // The setup frame must be the first thing on the wire, before the
        // stream is split and the pump tasks take over.
        let setup = utils::build_setup(&self.config);
        let setup_json = serde_json::to_string(&types::ClientMessage::Setup(setup))?;
        ws_stream.send(Message::Text(setup_json)).await?;

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (e_tx, _) = tokio::sync::broadcast::channel(self.capacity);
        // Dropped by the reader on exit so the writer stops when the peer
        // closes first.
        let (done_tx, mut done_rx) = tokio::sync::oneshot::channel::<()>();

        self.c_tx = Some(c_tx);
        self.e_tx = Some(e_tx.clone());

        // Writer task: serializes outbound messages onto the socket. The
        // struct holds the only outbound sender, so dropping it (or calling
        // `close`) drains the queue and runs the close handshake. A reader
        // exit ends the writer without one; the peer is already gone.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = c_rx.recv() => match message {
                        Some(message) => match serde_json::to_string(&message) {
                            Ok(text) => {
                                if let Err(e) = write.send(Message::Text(text)).await {
                                    tracing::error!("failed to send message: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!("failed to serialize message: {}", e);
                            }
                        },
                        None => {
                            if let Err(e) = write.send(Message::Close(None)).await {
                                tracing::debug!("failed to send close frame: {}", e);
                            }
                            break;
                        }
                    },
                    _ = &mut done_rx => break,
                }
            }
        });

        // Reader task: turns socket frames into broadcast events. The live
        // API delivers its JSON frames as binary payloads, so binary data
        // starting with '{' is treated as a JSON frame.
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        if let Err(e) = e_tx.send(types::LiveEvent::Error(e.to_string())) {
                            tracing::error!("failed to send error event: {}", e);
                        }
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        handle_frame(&text, &e_tx);
                    }
                    Message::Binary(data) if data.first() == Some(&b'{') => {
                        match std::str::from_utf8(&data) {
                            Ok(text) => handle_frame(text, &e_tx),
                            Err(e) => tracing::warn!("binary frame is not valid utf-8: {}", e),
                        }
                    }
                    Message::Binary(data) => {
                        tracing::warn!("unexpected binary message: {} bytes", data.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        let close_event = types::LiveEvent::Closed {
                            reason: reason.map(|v| format!("{:?}", v)),
                        };
                        if let Err(e) = e_tx.send(close_event) {
                            tracing::error!("failed to send close event: {}", e);
                        }
                        break;
                    }
                    _ => {}
                }
            }
            drop(done_tx);
            drop(e_tx);
        });
        Ok(())
    }

    /// Get a receiver for the inbound event stream.
    pub async fn server_events(&mut self) -> Result<EventRx> {
        match self.e_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    async fn send_client_message(&mut self, message: types::ClientMessage) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(message).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    /// Queue one chunk of base64 PCM16 microphone audio. Returns once the
    /// chunk is enqueued, not once the server has received it.
    pub async fn send_realtime_audio(&mut self, audio: Base64EncodedAudioBytes) -> Result<()> {
        let message = types::ClientMessage::RealtimeInput(types::RealtimeInput::audio(audio));
        self.send_client_message(message).await
    }

    /// Ends the outbound stream. Once the queued messages drain, the writer
    /// task completes the close handshake. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.c_tx = None;
        self.e_tx = None;
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

fn handle_frame(text: &str, e_tx: &EventTx) {
    match serde_json::from_str::<types::ServerMessage>(text) {
        Ok(message) => {
            if let Some(content) = &message.server_content {
                if content.turn_complete == Some(true) {
                    tracing::debug!("model turn complete");
                }
                if content.interrupted == Some(true) {
                    tracing::debug!("model turn interrupted");
                }
            }
            for event in message.into_events() {
                if let Err(e) = e_tx.send(event) {
                    tracing::error!("failed to send event: {}", e);
                }
            }
        }
        Err(e) => {
            tracing::error!("failed to deserialize frame: {}, text=> {:?}", e, text);
        }
    }
}

/// Create a client with a specific config and connect.
pub async fn connect_with_config(capacity: usize, config: config::Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

/// Connect with settings taken from the environment.
pub async fn connect() -> Result<Client> {
    let config = config::Config::new();
    connect_with_config(1024, config).await
}
