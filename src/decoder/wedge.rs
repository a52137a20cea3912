// Keyboard-wedge decoder
//
// Handheld scanners in keyboard mode type the payload followed by Enter. This adapter turns
// such a line stream into decoder events so a station without a camera still scans.

use super::{Decoder, DecoderCapabilities, DecoderError, DecoderEvent};
use crate::models::DecoderConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel capacity between the reader task and the session
const EVENT_BUFFER: usize = 16;

/// One line of scanner or keyboard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerLine {
    /// A UTF-8 line without its line ending
    Text(String),
    /// A line that is not valid UTF-8; the bytes are consumed
    Unreadable,
    /// End of input
    Closed,
}

/// Read the next line from `reader`, using `buf` as scratch space.
///
/// A garbled line is reported as [`ScannerLine::Unreadable`] and reading can carry on;
/// only a failing reader returns `Err`.
pub async fn next_scanner_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<ScannerLine>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(ScannerLine::Closed);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    Ok(match std::str::from_utf8(buf) {
        Ok(text) => ScannerLine::Text(text.to_string()),
        Err(_) => ScannerLine::Unreadable,
    })
}

/// Decoder over a line-oriented reader (stdin for a USB/Bluetooth scanner).
///
/// Lines read while paused are dropped, mirroring a camera decoder that stops sampling.
pub struct KeyboardWedgeDecoder<R> {
    reader: Mutex<Option<R>>,
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R> KeyboardWedgeDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            paused: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R> Decoder for KeyboardWedgeDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn capabilities(&self) -> DecoderCapabilities {
        DecoderCapabilities {
            max_fps: 60,
            remember_last_camera: false,
        }
    }

    async fn start(
        &self,
        config: &DecoderConfig,
    ) -> Result<mpsc::Receiver<DecoderEvent>, DecoderError> {
        let reader = self
            .reader
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| DecoderError::Failed("reader already consumed".to_string()))?;

        if self.stopped.load(Ordering::SeqCst) {
            return Err(DecoderError::Failed("decoder was stopped".to_string()));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let paused = Arc::clone(&self.paused);
        let stopped = Arc::clone(&self.stopped);

        tracing::debug!(fps = config.fps, "Keyboard wedge decoder started");

        let handle = tokio::spawn(async move {
            let mut reader = reader;
            let mut buf = Vec::new();

            loop {
                let line = match next_scanner_line(&mut reader, &mut buf).await {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Failed to read scanner input: {}", e);
                        break;
                    }
                };

                if stopped.load(Ordering::SeqCst) {
                    break;
                }

                let event = match line {
                    ScannerLine::Closed => {
                        tracing::info!("Scanner input closed");
                        break;
                    }
                    _ if paused.load(Ordering::SeqCst) => {
                        tracing::debug!("Dropping scanner input while paused");
                        continue;
                    }
                    ScannerLine::Unreadable => {
                        DecoderEvent::DecodeFailure("unreadable scanner input".to_string())
                    }
                    ScannerLine::Text(text) if text.trim().is_empty() => {
                        DecoderEvent::DecodeFailure("empty read".to_string())
                    }
                    ScannerLine::Text(text) => DecoderEvent::Decoded(text),
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        *self.task.lock().unwrap() = Some(handle);
        Ok(rx)
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
        tracing::debug!("Keyboard wedge decoder stopped");
    }
}

impl<R> Drop for KeyboardWedgeDecoder<R> {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_lines_become_events() {
        let input: &[u8] = b"1234\n\n0042\n";
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(input));
        let mut rx = decoder.start(&DecoderConfig::default()).await.unwrap();

        assert_eq!(rx.recv().await, Some(DecoderEvent::Decoded("1234".to_string())));
        assert!(matches!(rx.recv().await, Some(DecoderEvent::DecodeFailure(_))));
        assert_eq!(rx.recv().await, Some(DecoderEvent::Decoded("0042".to_string())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_garbled_line_is_noise() {
        let input: &[u8] = b"12\xff34\n5678\r\n";
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(input));
        let mut rx = decoder.start(&DecoderConfig::default()).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(DecoderEvent::DecodeFailure("unreadable scanner input".to_string()))
        );
        assert_eq!(rx.recv().await, Some(DecoderEvent::Decoded("5678".to_string())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_next_scanner_line() {
        let mut reader = BufReader::new(&b"0042\r\n\xfe\n99"[..]);
        let mut buf = Vec::new();

        assert_eq!(
            next_scanner_line(&mut reader, &mut buf).await.unwrap(),
            ScannerLine::Text("0042".to_string())
        );
        assert_eq!(
            next_scanner_line(&mut reader, &mut buf).await.unwrap(),
            ScannerLine::Unreadable
        );
        assert_eq!(
            next_scanner_line(&mut reader, &mut buf).await.unwrap(),
            ScannerLine::Text("99".to_string())
        );
        assert_eq!(
            next_scanner_line(&mut reader, &mut buf).await.unwrap(),
            ScannerLine::Closed
        );
    }

    #[tokio::test]
    async fn test_paused_lines_dropped() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(reader));
        let mut rx = decoder.start(&DecoderConfig::default()).await.unwrap();

        decoder.pause();
        assert!(decoder.is_paused());
        writer.write_all(b"1111\n").await.unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        decoder.resume();
        writer.write_all(b"2222\n").await.unwrap();
        drop(writer);

        assert_eq!(rx.recv().await, Some(DecoderEvent::Decoded("2222".to_string())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let input: &[u8] = b"";
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(input));
        assert!(decoder.start(&DecoderConfig::default()).await.is_ok());
        assert!(matches!(
            decoder.start(&DecoderConfig::default()).await,
            Err(DecoderError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (_writer, reader) = tokio::io::duplex(64);
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(reader));
        let mut rx = decoder.start(&DecoderConfig::default()).await.unwrap();

        decoder.stop();
        decoder.stop();

        // Aborting the reader task drops the sender
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_declares_no_camera_memory() {
        let input: &[u8] = b"";
        let decoder = KeyboardWedgeDecoder::new(BufReader::new(input));
        assert!(!decoder.capabilities().remember_last_camera);
    }
}
