//! Serial session state machine.
//!
//! A session owns one open device and one background execution context, and
//! both live and die together. The worker thread drives a single-threaded
//! runtime on which a continuous read chain (command detection) and a 30 Hz
//! transmit tick interleave, never running concurrently. The controlling
//! thread talks to the worker only through the mutex-guarded stop flag,
//! sampled once per tick.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf};
use tokio::runtime;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::core::channel::{ChannelError, ChannelOpener, Link};
use crate::core::frame::corrupt_checksum;
use crate::core::inspect::{self, Direction};
use crate::core::source::{FrameSource, SourceError};

/// Inbound command that switches the device into streaming mode. Received
/// text is stripped of CR/LF before comparison; anything else is ignored.
pub const STREAM_COMMAND: &str = "$TSC,BIN,30";

/// Transmit period of the streaming loop (30 Hz).
pub const TICK_PERIOD: Duration = Duration::from_micros(1_000_000 / 30);

const READ_BUF_SIZE: usize = 1024;

/// Session start failures. Any of these leaves the session idle with no
/// device handle and no worker thread.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` was called while a session is running.
    #[error("a session is already running")]
    AlreadyRunning,

    /// The device could not be opened.
    #[error(transparent)]
    Open(#[from] ChannelError),

    /// The selected frame log is unusable.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The worker thread or its runtime could not be launched.
    #[error("failed to launch session worker: {0}")]
    Launch(#[from] io::Error),
}

/// Live diagnostic switches shared between the operator side and the
/// session. Sampled per I/O event, so flips take effect without a restart.
#[derive(Debug, Default)]
pub struct DiagnosticToggles {
    dump: AtomicBool,
    checksum_error: AtomicBool,
}

impl DiagnosticToggles {
    /// Create toggles with explicit initial states.
    pub fn new(dump: bool, checksum_error: bool) -> Self {
        Self {
            dump: AtomicBool::new(dump),
            checksum_error: AtomicBool::new(checksum_error),
        }
    }

    /// Enable or disable the hex/ASCII traffic trace.
    pub fn set_dump(&self, enabled: bool) {
        self.dump.store(enabled, Ordering::Relaxed);
    }

    /// Whether the traffic trace is active.
    pub fn dump(&self) -> bool {
        self.dump.load(Ordering::Relaxed)
    }

    /// Enable or disable checksum fault injection on transmitted frames.
    pub fn set_checksum_error(&self, enabled: bool) {
        self.checksum_error.store(enabled, Ordering::Relaxed);
    }

    /// Whether checksum fault injection is active.
    pub fn checksum_error(&self) -> bool {
        self.checksum_error.load(Ordering::Relaxed)
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device open, no worker running.
    Idle,
    /// Device open, worker ticking.
    Running,
}

struct Worker {
    id: Uuid,
    stop: Arc<Mutex<bool>>,
    handle: JoinHandle<()>,
}

/// Coordinates session start and stop around one device and one worker.
pub struct SessionController {
    opener: Arc<dyn ChannelOpener>,
    toggles: Arc<DiagnosticToggles>,
    worker: Option<Worker>,
}

impl SessionController {
    /// Create a controller with default (all-off) diagnostic toggles.
    pub fn new(opener: Arc<dyn ChannelOpener>) -> Self {
        Self::with_toggles(opener, Arc::new(DiagnosticToggles::default()))
    }

    /// Create a controller around an externally owned toggle set.
    pub fn with_toggles(opener: Arc<dyn ChannelOpener>, toggles: Arc<DiagnosticToggles>) -> Self {
        Self {
            opener,
            toggles,
            worker: None,
        }
    }

    /// Handle to the diagnostic toggles, for the configuration surface.
    pub fn toggles(&self) -> Arc<DiagnosticToggles> {
        self.toggles.clone()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if self.worker.is_some() {
            SessionState::Running
        } else {
            SessionState::Idle
        }
    }

    /// Whether a session is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Id of the running session, if any.
    pub fn session_id(&self) -> Option<Uuid> {
        self.worker.as_ref().map(|w| w.id)
    }

    /// Start a session on `device`, replaying `source` once streaming is
    /// requested by the host.
    ///
    /// Blocks until the device is open and the worker is live, or returns
    /// the open failure with the controller still idle. The streaming flag
    /// starts cleared every session; a running session must be stopped
    /// before another start.
    pub fn start(&mut self, device: &str, source: FrameSource) -> Result<Uuid, SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let id = Uuid::new_v4();
        let stop = Arc::new(Mutex::new(false));
        let opener = self.opener.clone();
        let toggles = self.toggles.clone();
        let device = device.to_string();
        let log = source.name().to_string();

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), SessionError>>();
        let worker_stop = stop.clone();
        let worker_device = device.clone();

        let handle = thread::Builder::new()
            .name("imu-session".into())
            .spawn(move || {
                let rt = match runtime::Builder::new_current_thread()
                    .enable_io()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SessionError::Launch(e)));
                        return;
                    }
                };

                rt.block_on(async move {
                    let link = match opener.open(&worker_device).await {
                        Ok(link) => link,
                        Err(e) => {
                            let _ = ready_tx.send(Err(SessionError::Open(e)));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));
                    run_session(id, link, source, worker_stop, toggles).await;
                });
                // The runtime drops here, cancelling any pending read and
                // closing the device before the join in `stop` returns.
            })
            .map_err(SessionError::Launch)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(session = %id, device = %device, log = %log, "session started");
                self.worker = Some(Worker { id, stop, handle });
                Ok(id)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SessionError::Launch(io::Error::other(
                    "session worker exited before reporting readiness",
                )))
            }
        }
    }

    /// Cooperative stop: raise the stop flag, join the worker, release the
    /// device. Bounded by roughly one tick period. Idempotent; calling it on
    /// an idle session is a no-op.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        *worker.stop.lock() = true;
        if worker.handle.join().is_err() {
            tracing::error!(session = %worker.id, "session worker panicked");
        }
        tracing::info!(session = %worker.id, "session stopped");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the worker: read chain plus transmit tick on one runtime.
async fn run_session(
    id: Uuid,
    link: Box<dyn Link>,
    mut source: FrameSource,
    stop: Arc<Mutex<bool>>,
    toggles: Arc<DiagnosticToggles>,
) {
    let streaming = Arc::new(AtomicBool::new(false));
    let (reader, mut writer) = tokio::io::split(link);

    let read_task = tokio::spawn(read_chain(id, reader, streaming.clone(), toggles.clone()));

    let mut tick = tokio::time::interval(TICK_PERIOD);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        if *stop.lock() {
            break;
        }
        if !streaming.load(Ordering::Relaxed) {
            continue;
        }

        let mut record = source.next_frame();
        if toggles.checksum_error() {
            corrupt_checksum(&mut record);
        }
        let frame = Bytes::copy_from_slice(&record);

        // A stalled host must not pin the stop path, so a write gets at most
        // one tick period before this tick's emission is abandoned.
        match tokio::time::timeout(TICK_PERIOD, writer.write_all(&frame)).await {
            Ok(Ok(())) => {
                if toggles.dump() {
                    tracing::info!(session = %id, "{}", inspect::dump_sentence(&frame));
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(session = %id, error = %e, "frame write failed, skipping tick");
            }
            Err(_) => {
                tracing::warn!(session = %id, "frame write stalled, skipping tick");
            }
        }
    }

    read_task.abort();
    let _ = read_task.await;
}

/// Continuous inbound read chain. Each completed read is traced when the
/// dump toggle is on, stripped of CR/LF, and compared against
/// [`STREAM_COMMAND`]; unrecognized text is silently ignored.
///
/// A transport error ends the chain without rearming it: the session keeps
/// ticking and recovery is an operator-initiated restart.
async fn read_chain(
    id: Uuid,
    mut reader: ReadHalf<Box<dyn Link>>,
    streaming: Arc<AtomicBool>,
    toggles: Arc<DiagnosticToggles>,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!(session = %id, "peer closed the link");
                break;
            }
            Ok(n) => {
                let data = &buf[..n];
                if toggles.dump() {
                    tracing::info!(session = %id, "{}", inspect::dump(Direction::Read, data));
                }
                if is_stream_command(data) {
                    streaming.store(true, Ordering::Relaxed);
                    tracing::info!(session = %id, "streaming enabled");
                }
            }
            Err(e) => {
                tracing::warn!(session = %id, error = %e, "read failed, command chain stopped");
                break;
            }
        }
    }
}

fn is_stream_command(data: &[u8]) -> bool {
    let text: String = String::from_utf8_lossy(data)
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    text == STREAM_COMMAND
}
