use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::pipeline::pipeline_executor::{ExecutionError, PipelineConfig, PipelineExecutor};
use crate::shared::frame::Frame;
use crate::shared::media_asset::MediaAsset;
use crate::video::domain::video_encoder::{EncodeError, VideoEncoder};
use crate::video::domain::video_reader::VideoReader;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// Streams frames through dedicated threads.
///
/// Layout: `reader → main [composite] → encoder`
///
/// Decoding and encoding overlap with compositing; bounded channels keep
/// memory flat regardless of video length.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut encoder: Box<dyn VideoEncoder>,
        compositor: FrameCompositor,
        asset: &MediaAsset,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<usize, ExecutionError> {
        let cap = self.channel_capacity;
        encoder.open(output_path, asset)?;

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, String>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, config.cancelled.clone());
        let encoder_handle = spawn_encoder(encoder, write_rx);

        let outcome = run_main_loop(
            frame_rx,
            &write_tx,
            &compositor,
            asset.total_frames,
            &config,
        );
        drop(write_tx);

        join_threads(reader_handle, encoder_handle, outcome, &config.cancelled)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, String>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            if frame_tx.send(frame_result.map_err(|e| e.to_string())).is_err() {
                break;
            }
        }
        reader.close();
    })
}

fn spawn_encoder(
    mut encoder: Box<dyn VideoEncoder>,
    write_rx: crossbeam_channel::Receiver<Frame>,
) -> JoinHandle<(Box<dyn VideoEncoder>, Result<(), EncodeError>)> {
    std::thread::spawn(move || {
        for frame in write_rx {
            if let Err(e) = encoder.write(&frame) {
                return (encoder, Err(e));
            }
        }
        (encoder, Ok(()))
    })
}

/// Receives decoded frames, draws the active overlay and forwards them to
/// the encoder. Returns the number of frames forwarded.
fn run_main_loop(
    frame_rx: crossbeam_channel::Receiver<Result<Frame, String>>,
    write_tx: &crossbeam_channel::Sender<Frame>,
    compositor: &FrameCompositor,
    total_frames: usize,
    config: &PipelineConfig,
) -> Result<usize, ExecutionError> {
    let mut frames_done = 0usize;

    for frame_result in frame_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            return Err(ExecutionError::Cancelled);
        }

        let mut frame = frame_result.map_err(ExecutionError::Read)?;
        compositor.compose(&mut frame);

        if write_tx.send(frame).is_err() {
            // Encoder thread stopped; its error is reported on join
            break;
        }
        frames_done += 1;

        if let Some(ref callback) = config.on_progress {
            if !callback(frames_done, total_frames) {
                config.cancelled.store(true, Ordering::Relaxed);
                return Err(ExecutionError::Cancelled);
            }
        }
    }

    if config.cancelled.load(Ordering::Relaxed) {
        return Err(ExecutionError::Cancelled);
    }
    Ok(frames_done)
}

/// Joins both threads and reports the first error. The encoder is closed
/// (flushed and muxed) only when every frame made it through.
fn join_threads(
    reader_handle: JoinHandle<()>,
    encoder_handle: JoinHandle<(Box<dyn VideoEncoder>, Result<(), EncodeError>)>,
    outcome: Result<usize, ExecutionError>,
    cancelled: &AtomicBool,
) -> Result<usize, ExecutionError> {
    if outcome.is_err() {
        // Unblock the reader if it is waiting on a full channel
        cancelled.store(true, Ordering::Relaxed);
    }

    let reader_panicked = reader_handle.join().is_err();
    let (mut encoder, write_result) = encoder_handle
        .join()
        .map_err(|_| EncodeError::Encode("encoder thread panicked".to_string()))?;

    let frames = outcome?;
    write_result?;
    if reader_panicked {
        return Err(ExecutionError::Read("reader thread panicked".to_string()));
    }

    encoder.close()?;
    Ok(frames)
}
