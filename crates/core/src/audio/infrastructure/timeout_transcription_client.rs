use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::audio::domain::transcription_client::{TranscriptionClient, TranscriptionError};
use crate::audio::domain::waveform::Waveform;

/// Decorator that bounds any client by a wall-clock deadline.
///
/// The inner call runs on a worker thread. If it misses the deadline the
/// result is reported as [`TranscriptionError::Unavailable`] and the inner
/// client's abort flag is raised. Clients that honour the flag (whisper)
/// stop soon after; the rest finish in the background, still using CPU or
/// a connection until they return, and their late answer is discarded.
pub struct TimeoutTranscriptionClient {
    inner: Arc<dyn TranscriptionClient>,
    timeout: Duration,
}

impl TimeoutTranscriptionClient {
    pub fn new(inner: Arc<dyn TranscriptionClient>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl TranscriptionClient for TimeoutTranscriptionClient {
    fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscriptionError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let inner = Arc::clone(&self.inner);
        let waveform = waveform.clone();
        let abort = Arc::new(AtomicBool::new(false));
        let worker_abort = Arc::clone(&abort);

        std::thread::Builder::new()
            .name("transcription".to_string())
            .spawn(move || {
                let _ = tx.send(inner.transcribe_abortable(&waveform, worker_abort));
            })
            .map_err(|e| TranscriptionError::Unavailable(format!("worker spawn failed: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                abort.store(true, Ordering::Relaxed);
                Err(TranscriptionError::Unavailable(format!(
                    "no response within {:.1}s",
                    self.timeout.as_secs_f64()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TranscriptionError::Unavailable(
                "transcription worker panicked".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClient {
        delay: Duration,
        answer: Result<String, TranscriptionError>,
    }

    impl TranscriptionClient for SlowClient {
        fn transcribe(&self, _: &Waveform) -> Result<String, TranscriptionError> {
            std::thread::sleep(self.delay);
            self.answer.clone()
        }
    }

    /// Spins until aborted, then reports that it stopped.
    struct AbortableClient {
        stopped: crossbeam_channel::Sender<()>,
    }

    impl TranscriptionClient for AbortableClient {
        fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscriptionError> {
            self.transcribe_abortable(waveform, Arc::new(AtomicBool::new(false)))
        }

        fn transcribe_abortable(
            &self,
            _: &Waveform,
            abort: Arc<AtomicBool>,
        ) -> Result<String, TranscriptionError> {
            for _ in 0..1000 {
                if abort.load(Ordering::Relaxed) {
                    let _ = self.stopped.send(());
                    return Err(TranscriptionError::Unavailable("aborted".to_string()));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok("never aborted".to_string())
        }
    }

    struct PanickingClient;

    impl TranscriptionClient for PanickingClient {
        fn transcribe(&self, _: &Waveform) -> Result<String, TranscriptionError> {
            panic!("model crashed");
        }
    }

    fn waveform() -> Waveform {
        Waveform::new(vec![0.0; 160], 16000, 1)
    }

    #[test]
    fn test_fast_answer_passes_through() {
        let client = TimeoutTranscriptionClient::new(
            Arc::new(SlowClient {
                delay: Duration::ZERO,
                answer: Ok("hi there".to_string()),
            }),
            Duration::from_secs(5),
        );
        assert_eq!(client.transcribe(&waveform()).unwrap(), "hi there");
    }

    #[test]
    fn test_inner_error_passes_through() {
        let client = TimeoutTranscriptionClient::new(
            Arc::new(SlowClient {
                delay: Duration::ZERO,
                answer: Err(TranscriptionError::Ambiguous("silence".to_string())),
            }),
            Duration::from_secs(5),
        );
        assert_eq!(
            client.transcribe(&waveform()).unwrap_err(),
            TranscriptionError::Ambiguous("silence".to_string())
        );
    }

    #[test]
    fn test_deadline_maps_to_unavailable() {
        let client = TimeoutTranscriptionClient::new(
            Arc::new(SlowClient {
                delay: Duration::from_millis(500),
                answer: Ok("too late".to_string()),
            }),
            Duration::from_millis(50),
        );
        let err = client.transcribe(&waveform()).unwrap_err();
        assert!(matches!(err, TranscriptionError::Unavailable(_)));
    }

    #[test]
    fn test_deadline_aborts_the_worker() {
        let (stopped_tx, stopped_rx) = crossbeam_channel::bounded(1);
        let client = TimeoutTranscriptionClient::new(
            Arc::new(AbortableClient {
                stopped: stopped_tx,
            }),
            Duration::from_millis(50),
        );

        let err = client.transcribe(&waveform()).unwrap_err();
        assert!(matches!(err, TranscriptionError::Unavailable(_)));
        assert!(stopped_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_default_abortable_call_ignores_flag() {
        let client = SlowClient {
            delay: Duration::ZERO,
            answer: Ok("done".to_string()),
        };
        let abort = Arc::new(AtomicBool::new(true));
        assert_eq!(client.transcribe_abortable(&waveform(), abort).unwrap(), "done");
    }

    #[test]
    fn test_worker_panic_maps_to_unavailable() {
        let client =
            TimeoutTranscriptionClient::new(Arc::new(PanickingClient), Duration::from_secs(5));
        let err = client.transcribe(&waveform()).unwrap_err();
        assert!(matches!(err, TranscriptionError::Unavailable(_)));
    }
}
