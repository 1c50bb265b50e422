//! End-to-end session tests over an in-memory duplex link.
//!
//! The far end of the duplex pair plays the host under test: it sends the
//! streaming command and reads back the replayed frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::timeout;

use imu_sim::{
    start_exit_code, ChannelError, ChannelOpener, DiagnosticToggles, ExitCodes, FrameSource, Link,
    SessionController, SessionError, SessionState, FRAME_LEN,
};

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Hands out queued near ends of duplex pairs; the far ends stay with the
/// test. An exhausted queue behaves like a missing device.
struct DuplexOpener {
    links: Mutex<Vec<DuplexStream>>,
}

impl DuplexOpener {
    fn with_links(links: Vec<DuplexStream>) -> Self {
        Self {
            links: Mutex::new(links),
        }
    }

    fn empty() -> Self {
        Self::with_links(Vec::new())
    }
}

#[async_trait]
impl ChannelOpener for DuplexOpener {
    async fn open(&self, device: &str) -> Result<Box<dyn Link>, ChannelError> {
        let mut links = self.links.lock();
        if links.is_empty() {
            return Err(ChannelError::NotFound(device.to_string()));
        }
        Ok(Box::new(links.remove(0)) as Box<dyn Link>)
    }
}

fn single_pair() -> (DuplexOpener, DuplexStream) {
    let (near, far) = tokio::io::duplex(4096);
    (DuplexOpener::with_links(vec![near]), far)
}

fn two_record_source() -> FrameSource {
    let mut data = Vec::new();
    data.extend(std::iter::repeat(0xA0).take(FRAME_LEN));
    data.extend(std::iter::repeat(0xB1).take(FRAME_LEN));
    FrameSource::from_bytes("sample.bin", data).unwrap()
}

async fn recv_frame(far: &mut DuplexStream) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    timeout(RECV_TIMEOUT, far.read_exact(&mut frame))
        .await
        .expect("timed out waiting for a frame")
        .expect("read failed");
    frame
}

#[tokio::test]
async fn streams_records_cyclically_after_command() {
    let (opener, mut far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));

    session.start("virtual0", two_record_source()).unwrap();
    assert_eq!(session.state(), SessionState::Running);

    far.write_all(b"$TSC,BIN,30\r\n").await.unwrap();

    assert!(recv_frame(&mut far).await.iter().all(|b| *b == 0xA0));
    assert!(recv_frame(&mut far).await.iter().all(|b| *b == 0xB1));
    // Third frame wraps back to record 0.
    assert!(recv_frame(&mut far).await.iter().all(|b| *b == 0xA0));

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn stays_silent_until_exact_command() {
    let (opener, mut far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));
    session.start("virtual0", two_record_source()).unwrap();

    far.write_all(b"$TSC,BIN,31\r\n").await.unwrap();
    far.write_all(b"\r\n").await.unwrap();
    far.write_all(b"$TSC,BIN,30 \r\n").await.unwrap();

    let mut buf = [0u8; 1];
    let outcome = timeout(Duration::from_millis(150), far.read(&mut buf)).await;
    assert!(outcome.is_err(), "no frame should be transmitted");

    session.stop();
}

#[tokio::test]
async fn checksum_injection_hits_only_trailing_bytes() {
    let (opener, mut far) = single_pair();
    let toggles = Arc::new(DiagnosticToggles::default());
    toggles.set_checksum_error(true);
    let mut session = SessionController::with_toggles(Arc::new(opener), toggles);

    session.start("virtual0", two_record_source()).unwrap();
    far.write_all(b"$TSC,BIN,30\r\n").await.unwrap();

    let frame = recv_frame(&mut far).await;
    for (i, byte) in frame.iter().enumerate() {
        if i == FRAME_LEN - 3 || i == FRAME_LEN - 4 {
            assert_eq!(*byte, b'?', "byte {i} should be corrupted");
        } else {
            assert_eq!(*byte, 0xA0, "byte {i} should be untouched");
        }
    }

    session.stop();
}

#[tokio::test]
async fn checksum_toggle_applies_without_restart() {
    let (opener, mut far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));
    let toggles = session.toggles();

    session.start("virtual0", two_record_source()).unwrap();
    far.write_all(b"$TSC,BIN,30\r\n").await.unwrap();

    assert!(recv_frame(&mut far).await.iter().all(|b| *b != b'?'));

    toggles.set_checksum_error(true);
    // Frames produced before the flip may still be buffered; corruption must
    // show up within a handful of ticks.
    let mut corrupted = false;
    for _ in 0..30 {
        let frame = recv_frame(&mut far).await;
        if frame[FRAME_LEN - 3] == b'?' {
            assert_eq!(frame[FRAME_LEN - 4], b'?');
            corrupted = true;
            break;
        }
    }
    assert!(corrupted, "toggle flip never reached the write path");

    session.stop();
}

#[tokio::test]
async fn stop_is_bounded_and_idempotent() {
    let (opener, _far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));
    session.start("virtual0", two_record_source()).unwrap();

    let begin = Instant::now();
    session.stop();
    assert!(begin.elapsed() < Duration::from_secs(1), "stop should be bounded");
    assert_eq!(session.state(), SessionState::Idle);

    // Second stop on an idle session is a no-op.
    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn restart_after_stop_reopens_the_device() {
    let (near_a, mut far_a) = tokio::io::duplex(4096);
    let (near_b, mut far_b) = tokio::io::duplex(4096);
    let opener = DuplexOpener::with_links(vec![near_a, near_b]);
    let mut session = SessionController::new(Arc::new(opener));

    session.start("virtual0", two_record_source()).unwrap();
    far_a.write_all(b"$TSC,BIN,30\r\n").await.unwrap();
    recv_frame(&mut far_a).await;
    session.stop();

    // New session starts with streaming cleared: silent until commanded.
    session.start("virtual0", two_record_source()).unwrap();
    let mut buf = [0u8; 1];
    assert!(timeout(Duration::from_millis(150), far_b.read(&mut buf))
        .await
        .is_err());

    far_b.write_all(b"$TSC,BIN,30\r\n").await.unwrap();
    assert!(recv_frame(&mut far_b).await.iter().all(|b| *b == 0xA0));

    session.stop();
}

#[tokio::test]
async fn second_start_is_rejected_while_running() {
    let (opener, _far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));
    session.start("virtual0", two_record_source()).unwrap();

    let err = session
        .start("virtual0", two_record_source())
        .expect_err("second start must be rejected");
    assert!(matches!(err, SessionError::AlreadyRunning));
    assert_eq!(start_exit_code(&err), ExitCodes::BUSY);

    session.stop();
}

#[tokio::test]
async fn start_fails_cleanly_when_device_is_missing() {
    let mut session = SessionController::new(Arc::new(DuplexOpener::empty()));

    let err = session
        .start("virtual0", two_record_source())
        .expect_err("open must fail");
    assert!(matches!(
        err,
        SessionError::Open(ChannelError::NotFound(ref device)) if device == "virtual0"
    ));
    assert_eq!(start_exit_code(&err), ExitCodes::NO_SUCH_ENTRY);
    assert_eq!(session.state(), SessionState::Idle);

    // Stop after a failed start is a safe no-op.
    session.stop();
}

#[tokio::test]
async fn host_disconnect_does_not_break_stop() {
    let (opener, far) = single_pair();
    let mut session = SessionController::new(Arc::new(opener));
    session.start("virtual0", two_record_source()).unwrap();

    // Closing the far end ends the read chain with EOF; the session must
    // still stop cleanly.
    drop(far);
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
}
