//! Live mentor session lifecycle.
//!
//! [`LiveMentor`] ties the whole voice path together: microphone capture,
//! the live connection, scheduled playback of the mentor's replies, and
//! transcription callbacks. Everything a session needs is acquired by
//! [`LiveMentor::connect`] and released by [`LiveMentor::disconnect`].

use anyhow::{Context, Result};
use fabmentor_native_utils::audio::{self, INPUT_FRAME_SAMPLES, LIVE_API_INPUT_SAMPLE_RATE};
use mentor_realtime::types::{LiveEvent, Speaker};
use mentor_realtime::{Client, EventRx};
use rubato::{FastFixedIn, Resampler};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::capture::CaptureGraph;
use crate::config::INPUT_CHUNK_SIZE;
use crate::playback::{self, OutputStreamGuard, PlaybackQueue};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session. The starting state, and the state after [`LiveMentor::disconnect`].
    Disconnected,
    /// The connection is up and the setup frame is sent, but the server has
    /// not acknowledged it yet.
    Connecting,
    /// The server accepted the setup; audio flows in both directions.
    Open,
    /// The server closed the connection. Local teardown has not run yet.
    Closed,
}

/// Called for every transcription fragment, in arrival order.
pub type TranscriptCallback = Arc<dyn Fn(&str, Speaker) + Send + Sync>;

/// Everything owned by one live session. Dropping it stops capture and
/// cancels both pump tasks.
struct SessionRuntime {
    capture: CaptureGraph,
    pump: JoinHandle<()>,
    dispatch: JoinHandle<()>,
}

/// A voice conversation with the mentor model.
///
/// The output stream outlives the session runtime on purpose: replies that
/// were scheduled before a disconnect keep playing to the end.
pub struct LiveMentor {
    config: mentor_realtime::Config,
    on_transcript: TranscriptCallback,
    state: Arc<Mutex<SessionState>>,
    open_gate: Arc<AtomicBool>,
    runtime: Option<SessionRuntime>,
    output: Option<OutputStreamGuard>,
    input_device: Option<String>,
    output_device: Option<String>,
}

impl LiveMentor {
    pub fn new(
        config: mentor_realtime::Config,
        on_transcript: impl Fn(&str, Speaker) + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            on_transcript: Arc::new(on_transcript),
            state: Arc::new(Mutex::new(SessionState::Disconnected)),
            open_gate: Arc::new(AtomicBool::new(false)),
            runtime: None,
            output: None,
            input_device: None,
            output_device: None,
        }
    }

    /// Capture from this device instead of the system default.
    pub fn with_input_device(mut self, device_name: Option<String>) -> Self {
        self.input_device = device_name;
        self
    }

    /// Play through this device instead of the system default.
    pub fn with_output_device(mut self, device_name: Option<String>) -> Self {
        self.output_device = device_name;
        self
    }

    pub fn state(&self) -> SessionState {
        if let Ok(state) = self.state.lock() {
            *state
        } else {
            SessionState::Disconnected
        }
    }

    /// Brings a session up: opens the audio devices, connects, and starts
    /// the pump tasks. Returns once the setup frame is on the wire; the
    /// transition to [`SessionState::Open`] happens when the server
    /// acknowledges it. If any step fails, everything acquired so far is
    /// released and the state returns to `Disconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| anyhow::anyhow!("session state poisoned"))?;
            if *state != SessionState::Disconnected {
                return Err(anyhow::anyhow!("already connected"));
            }
            *state = SessionState::Connecting;
        }

        match self.establish().await {
            Ok(()) => Ok(()),
            Err(e) => {
                set_state(&self.state, SessionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<()> {
        let (frames_tx, frames_rx) = tokio::sync::mpsc::channel::<Vec<f32>>(1024);

        let capture = CaptureGraph::open(self.input_device.clone(), frames_tx)
            .context("Failed to open microphone capture")?;

        let (output, queue) = playback::open_output(self.output_device.clone())
            .context("Failed to open audio output")?;

        let in_resampler = audio::create_resampler(
            capture.sample_rate() as f64,
            LIVE_API_INPUT_SAMPLE_RATE,
            INPUT_CHUNK_SIZE,
        )?;

        let mut client = mentor_realtime::connect_with_config(1024, self.config.clone())
            .await
            .context("Failed to connect to the live mentor API")?;
        let events = client
            .server_events()
            .await
            .context("Failed to get server events channel")?;

        self.open_gate.store(false, Ordering::SeqCst);

        let dispatch = tokio::spawn(run_dispatch(
            events,
            queue,
            self.on_transcript.clone(),
            self.state.clone(),
            self.open_gate.clone(),
        ));

        let pump = tokio::spawn(run_capture_pump(
            frames_rx,
            client,
            in_resampler,
            self.open_gate.clone(),
        ));

        self.output = Some(output);
        self.runtime = Some(SessionRuntime {
            capture,
            pump,
            dispatch,
        });
        Ok(())
    }

    /// Tears the session down and returns to `Disconnected`. Safe to call
    /// at any time, including when no session is up. The microphone is
    /// released immediately; dropping the client's sender lets the writer
    /// task finish the close handshake in the background. The output stream
    /// stays open so already-scheduled audio can finish.
    pub fn disconnect(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        // The microphone goes first so no further frames are produced.
        drop(runtime.capture);
        runtime.pump.abort();
        runtime.dispatch.abort();
        self.open_gate.store(false, Ordering::SeqCst);
        set_state(&self.state, SessionState::Disconnected);
        tracing::info!("session disconnected");
    }
}

impl Drop for LiveMentor {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn set_state(state: &Arc<Mutex<SessionState>>, next: SessionState) {
    if let Ok(mut state) = state.lock() {
        *state = next;
    }
}

/// Consumes server events in arrival order and routes each to its sink:
/// audio to the playback queue, transcription to the callback, lifecycle
/// events to the state machine.
async fn run_dispatch(
    mut events: EventRx,
    mut queue: PlaybackQueue,
    on_transcript: TranscriptCallback,
    state: Arc<Mutex<SessionState>>,
    open_gate: Arc<AtomicBool>,
) {
    loop {
        match events.recv().await {
            Ok(LiveEvent::Opened) => {
                tracing::info!("live session open");
                set_state(&state, SessionState::Open);
                open_gate.store(true, Ordering::SeqCst);
            }
            Ok(LiveEvent::Audio(audio_bytes)) => {
                let samples = audio::decode(&audio_bytes);
                // An undecodable chunk is skipped; the playback cursor does
                // not move for audio that never entered the queue.
                if samples.is_empty() {
                    continue;
                }
                queue.play(&samples);
            }
            Ok(LiveEvent::Transcript(fragment)) => {
                (on_transcript)(fragment.text(), fragment.speaker());
            }
            Ok(LiveEvent::Closed { reason }) => {
                tracing::info!("live session closed: {:?}", reason);
                open_gate.store(false, Ordering::SeqCst);
                if let Ok(mut state) = state.lock() {
                    // A close that races local teardown must not resurrect
                    // an already-disconnected session.
                    if matches!(*state, SessionState::Connecting | SessionState::Open) {
                        *state = SessionState::Closed;
                    }
                }
            }
            Ok(LiveEvent::Error(e)) => {
                // Surfaced in the log only. The state machine stays put; a
                // fatal transport error is followed by a close.
                tracing::error!("live session error: {}", e);
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("event stream lagged by {} messages", n);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                break;
            }
        }
    }
    tracing::debug!("dispatch loop stopped");
}

/// Drains captured microphone chunks, resamples them to the live API rate,
/// windows them into fixed frames, and sends each frame to the server.
/// Frames captured before the server acknowledges the setup are dropped.
async fn run_capture_pump(
    mut frames: tokio::sync::mpsc::Receiver<Vec<f32>>,
    mut client: Client,
    mut in_resampler: FastFixedIn<f32>,
    open_gate: Arc<AtomicBool>,
) {
    let mut buffer: VecDeque<f32> = VecDeque::with_capacity(INPUT_CHUNK_SIZE * 2);
    let mut window = audio::FrameWindow::new(INPUT_FRAME_SAMPLES);

    while let Some(chunk) = frames.recv().await {
        if !open_gate.load(Ordering::SeqCst) {
            continue;
        }

        buffer.extend(chunk);
        while buffer.len() >= INPUT_CHUNK_SIZE {
            let audio_chunk: Vec<f32> = buffer.drain(..INPUT_CHUNK_SIZE).collect();
            if let Ok(resampled) = in_resampler.process(&[audio_chunk.as_slice()], None) {
                if let Some(resampled) = resampled.first() {
                    window.push(resampled);
                }
            }
        }

        while let Some(frame) = window.pop_frame() {
            let audio_bytes = audio::encode(&frame);
            if let Err(e) = client.send_realtime_audio(audio_bytes).await {
                tracing::error!("Failed to send audio frame: {:?}", e);
            }
        }
    }
    tracing::debug!("capture pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OUTPUT_BUFFER_SECS;
    use fabmentor_native_utils::audio::LIVE_API_OUTPUT_SAMPLE_RATE;
    use fabmentor_native_utils::playback::SampleClock;
    use ringbuf::traits::{Observer, Split};

    fn test_queue() -> (PlaybackQueue, ringbuf::HeapCons<f32>) {
        let buffer =
            audio::shared_buffer(LIVE_API_OUTPUT_SAMPLE_RATE as usize * OUTPUT_BUFFER_SECS);
        let (producer, consumer) = buffer.split();
        let clock = SampleClock::new(LIVE_API_OUTPUT_SAMPLE_RATE);
        let resampler = audio::create_resampler(
            LIVE_API_OUTPUT_SAMPLE_RATE,
            LIVE_API_OUTPUT_SAMPLE_RATE,
            1024,
        )
        .unwrap();
        (PlaybackQueue::new(producer, clock, resampler), consumer)
    }

    fn test_config() -> mentor_realtime::Config {
        mentor_realtime::Config::builder()
            .with_api_key("test-key")
            .build()
    }

    async fn drive_dispatch(
        events: Vec<LiveEvent>,
        queue: PlaybackQueue,
        on_transcript: TranscriptCallback,
        state: Arc<Mutex<SessionState>>,
        open_gate: Arc<AtomicBool>,
    ) {
        let (tx, rx) = tokio::sync::broadcast::channel(64);
        let dispatch = tokio::spawn(run_dispatch(rx, queue, on_transcript, state, open_gate));
        for event in events {
            tx.send(event).unwrap();
        }
        // Dropping the sender ends the loop once every event is consumed.
        drop(tx);
        dispatch.await.unwrap();
    }

    #[test]
    fn test_disconnect_without_session_is_noop() {
        let mut mentor = LiveMentor::new(test_config(), |_, _| {});
        assert_eq!(mentor.state(), SessionState::Disconnected);
        mentor.disconnect();
        mentor.disconnect();
        assert_eq!(mentor.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_rejected_unless_disconnected() {
        let mut mentor = LiveMentor::new(test_config(), |_, _| {});

        *mentor.state.lock().unwrap() = SessionState::Open;
        assert!(mentor.connect().await.is_err());

        *mentor.state.lock().unwrap() = SessionState::Closed;
        assert!(mentor.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_opened_transitions_to_open() {
        let (queue, _consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Connecting));
        let gate = Arc::new(AtomicBool::new(false));

        drive_dispatch(
            vec![LiveEvent::Opened],
            queue,
            Arc::new(|_, _| {}),
            state.clone(),
            gate.clone(),
        )
        .await;

        assert_eq!(*state.lock().unwrap(), SessionState::Open);
        assert!(gate.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_closed_transitions_from_open() {
        let (queue, _consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Connecting));
        let gate = Arc::new(AtomicBool::new(false));

        drive_dispatch(
            vec![LiveEvent::Opened, LiveEvent::Closed { reason: None }],
            queue,
            Arc::new(|_, _| {}),
            state.clone(),
            gate.clone(),
        )
        .await;

        assert_eq!(*state.lock().unwrap(), SessionState::Closed);
        assert!(!gate.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_closed_does_not_resurrect_disconnected() {
        let (queue, _consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Disconnected));
        let gate = Arc::new(AtomicBool::new(false));

        drive_dispatch(
            vec![LiveEvent::Closed {
                reason: Some("going away".to_string()),
            }],
            queue,
            Arc::new(|_, _| {}),
            state.clone(),
            gate.clone(),
        )
        .await;

        assert_eq!(*state.lock().unwrap(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dispatch_error_leaves_state_untouched() {
        let (queue, _consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Connecting));
        let gate = Arc::new(AtomicBool::new(false));

        drive_dispatch(
            vec![
                LiveEvent::Opened,
                LiveEvent::Error("connection reset".to_string()),
            ],
            queue,
            Arc::new(|_, _| {}),
            state.clone(),
            gate.clone(),
        )
        .await;

        // An error is reported but is not a lifecycle transition.
        assert_eq!(*state.lock().unwrap(), SessionState::Open);
        assert!(gate.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_transcripts_in_order() {
        let (queue, _consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Open));
        let gate = Arc::new(AtomicBool::new(true));

        let seen: Arc<Mutex<Vec<(String, Speaker)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_transcript: TranscriptCallback = Arc::new(move |text, speaker| {
            sink.lock().unwrap().push((text.to_string(), speaker));
        });

        drive_dispatch(
            vec![
                LiveEvent::Transcript(mentor_realtime::types::TranscriptFragment::new(
                    "what is doping",
                    Speaker::User,
                )),
                LiveEvent::Transcript(mentor_realtime::types::TranscriptFragment::new(
                    "Doping introduces impurities",
                    Speaker::Model,
                )),
                LiveEvent::Transcript(mentor_realtime::types::TranscriptFragment::new(
                    " into the silicon lattice",
                    Speaker::Model,
                )),
            ],
            queue,
            on_transcript,
            state,
            gate,
        )
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("what is doping".to_string(), Speaker::User),
                ("Doping introduces impurities".to_string(), Speaker::Model),
                (" into the silicon lattice".to_string(), Speaker::Model),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_queues_audio_and_skips_undecodable() {
        let (queue, consumer) = test_queue();
        let state = Arc::new(Mutex::new(SessionState::Open));
        let gate = Arc::new(AtomicBool::new(true));

        let chunk = audio::encode(&vec![0.25; 2400]);
        drive_dispatch(
            vec![
                LiveEvent::Audio("%%%not-base64%%%".to_string()),
                LiveEvent::Audio(chunk),
            ],
            queue,
            Arc::new(|_, _| {}),
            state.clone(),
            gate,
        )
        .await;

        // Only the valid chunk reached the ring buffer.
        let occupied = consumer.occupied_len();
        assert!(occupied >= 2400, "expected at least 2400 samples, got {}", occupied);
        assert!(occupied <= 3200, "expected at most 3200 samples, got {}", occupied);
        assert_eq!(*state.lock().unwrap(), SessionState::Open);
    }
}
