//! Rodio-backed implementation of the playback traits.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use services::{AudioHandle, AudioOutput, PlaybackError};

/// Plays sources through the default audio device.
///
/// The `OutputStream` is not `Send`, so a dedicated thread owns it for the
/// life of the process and hands the `Send` handle back.
pub struct RodioAudioOutput {
    handle: OutputStreamHandle,
    http: reqwest::Client,
}

impl RodioAudioOutput {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::DeviceUnavailable` if no device can be opened.
    pub fn new() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                // Keep the stream alive; park wakes are harmless.
                let _stream = stream;
                let _ = tx.send(Ok(handle));
                loop {
                    std::thread::park();
                }
            }
            Err(err) => {
                let _ = tx.send(Err(PlaybackError::DeviceUnavailable(err.to_string())));
            }
        });

        let handle = rx
            .recv()
            .map_err(|err| PlaybackError::DeviceUnavailable(err.to_string()))??;
        Ok(Self {
            handle,
            http: reqwest::Client::new(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlaybackError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|err| PlaybackError::StartFailed(err.to_string()))?;
            if !response.status().is_success() {
                return Err(PlaybackError::StartFailed(format!(
                    "audio fetch failed with status {}",
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|err| PlaybackError::StartFailed(err.to_string()))?;
            Ok(bytes.to_vec())
        } else {
            std::fs::read(url).map_err(|err| PlaybackError::StartFailed(err.to_string()))
        }
    }
}

struct RodioHandle {
    source: String,
    sink: Arc<Sink>,
}

#[async_trait]
impl AudioHandle for RodioHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    async fn wait_finished(&self) {
        let sink = Arc::clone(&self.sink);
        let _ = tokio::task::spawn_blocking(move || sink.sleep_until_end()).await;
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    async fn start(
        &self,
        url: &str,
        volume: f64,
        rate: f64,
    ) -> Result<Arc<dyn AudioHandle>, PlaybackError> {
        let bytes = self.fetch(url).await?;
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|err| PlaybackError::StartFailed(err.to_string()))?;

        let sink = Sink::try_new(&self.handle)
            .map_err(|err| PlaybackError::DeviceUnavailable(err.to_string()))?;
        sink.set_volume(volume as f32);
        sink.set_speed(rate as f32);
        sink.append(source);

        Ok(Arc::new(RodioHandle {
            source: url.to_string(),
            sink: Arc::new(sink),
        }))
    }
}
