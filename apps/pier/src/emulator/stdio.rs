//! Emulator seam backed by the terminal the binary runs in.
//!
//! The hosting terminal is the display container: remote output is written
//! straight through to stdout and its own parser does the rendering, raw
//! mode turns keystrokes into an input byte stream, and the window size is
//! the container size.

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use std::io::{self, Read, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    EmulatorError, EmulatorEvent, EmulatorFactory, EmulatorSubscription, HostEvent,
    TerminalEmulator,
};

const SIZE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Builds a [`StdioEmulator`] once the session opens.
#[derive(Debug, Default)]
pub struct StdioEmulatorFactory;

impl StdioEmulatorFactory {
    pub fn new() -> Self {
        Self
    }
}

impl EmulatorFactory for StdioEmulatorFactory {
    fn open(&mut self) -> Result<EmulatorSubscription, EmulatorError> {
        enable_raw_mode()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel::<EmulatorEvent>();
        let (host_tx, host_rx) = mpsc::unbounded_channel::<HostEvent>();

        spawn_stdin_reader(events_tx.clone());
        spawn_size_poll(host_tx);

        let emulator = StdioEmulator {
            out: io::stdout(),
            events_tx,
            size: None,
            fullscreen: false,
            disposed: false,
        };

        Ok(EmulatorSubscription {
            emulator: Box::new(emulator),
            events: events_rx,
            host_events: host_rx,
        })
    }
}

/// Raw-mode stdin feeds the input events. The thread exits once the session
/// drops its subscription and the next read has nowhere to go.
fn spawn_stdin_reader(events_tx: mpsc::UnboundedSender<EmulatorEvent>) {
    std::thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 1024];
        let mut carry = Vec::new();
        loop {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let text = decode_input_chunk(&mut carry, &buf[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    if events_tx.send(EmulatorEvent::Input(text)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
        debug!("stdin reader stopped");
    });
}

/// Decode one read's worth of input, carrying an incomplete trailing UTF-8
/// sequence over to the next read. A multi-byte character split across two
/// reads (large pastes land on the 1024-byte buffer boundary) must arrive
/// intact, not as replacement characters.
fn decode_input_chunk(carry: &mut Vec<u8>, chunk: &[u8]) -> String {
    carry.extend_from_slice(chunk);
    let bytes = std::mem::take(carry);
    let mut out = String::new();
    let mut rest = bytes.as_slice();
    loop {
        match std::str::from_utf8(rest) {
            Ok(text) => {
                out.push_str(text);
                rest = &[];
                break;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                match err.error_len() {
                    // Garbage byte: replace it and keep going.
                    Some(len) => {
                        out.push('\u{fffd}');
                        rest = &after[len..];
                    }
                    // Incomplete trailing sequence: hold it for the next read.
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }
    *carry = rest.to_vec();
    out
}

/// Host-window resize notifications, polled since there is no portable
/// signal for them. The task ends itself when the subscription is dropped,
/// so a closed session leaves no poller behind.
fn spawn_size_poll(host_tx: mpsc::UnboundedSender<HostEvent>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SIZE_POLL_INTERVAL);
        let mut last = crossterm::terminal::size().ok();
        loop {
            ticker.tick().await;
            let current = crossterm::terminal::size().ok();
            if current != last {
                last = current;
                if host_tx.send(HostEvent::WindowResized).is_err() {
                    break;
                }
            }
        }
    });
}

pub struct StdioEmulator {
    out: io::Stdout,
    events_tx: mpsc::UnboundedSender<EmulatorEvent>,
    size: Option<(u16, u16)>,
    fullscreen: bool,
    disposed: bool,
}

impl TerminalEmulator for StdioEmulator {
    fn write(&mut self, text: &str) -> Result<(), EmulatorError> {
        // The hosting terminal consumes raw bytes; chars in 0..=255 map back
        // to the wire bytes they were decoded from.
        let mut bytes = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let cp = ch as u32;
            if cp <= 0xff {
                bytes.push(cp as u8);
            } else {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
        self.out.write_all(&bytes)?;
        self.out.flush()?;
        Ok(())
    }

    fn fit(&mut self) -> Result<(), EmulatorError> {
        let (cols, rows) = crossterm::terminal::size()?;
        if self.size != Some((cols, rows)) {
            self.size = Some((cols, rows));
            let _ = self.events_tx.send(EmulatorEvent::Resize { cols, rows });
        }
        Ok(())
    }

    fn set_fullscreen(&mut self, enabled: bool) -> Result<(), EmulatorError> {
        if enabled == self.fullscreen {
            return Ok(());
        }
        if enabled {
            execute!(self.out, EnterAlternateScreen)?;
        } else {
            execute!(self.out, LeaveAlternateScreen)?;
        }
        self.fullscreen = enabled;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), EmulatorError> {
        write!(self.out, "\x1b]2;{}\x07", title)?;
        self.out.flush()?;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if self.fullscreen {
            if let Err(err) = execute!(self.out, LeaveAlternateScreen) {
                warn!(error = %err, "failed to leave alternate screen");
            }
        }
        if let Err(err) = disable_raw_mode() {
            warn!(error = %err, "failed to restore terminal mode");
        }
        let _ = self.out.flush();
    }
}

impl Drop for StdioEmulator {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::decode_input_chunk;

    #[test]
    fn ascii_passes_through_without_carry() {
        let mut carry = Vec::new();
        assert_eq!(decode_input_chunk(&mut carry, b"ls -la\r"), "ls -la\r");
        assert!(carry.is_empty());
    }

    #[test]
    fn split_two_byte_sequence_survives_read_boundary() {
        let mut carry = Vec::new();
        // "é" is c3 a9; the read ends after the lead byte.
        assert_eq!(decode_input_chunk(&mut carry, &[b'a', 0xc3]), "a");
        assert_eq!(carry, vec![0xc3]);
        assert_eq!(decode_input_chunk(&mut carry, &[0xa9, b'b']), "éb");
        assert!(carry.is_empty());
    }

    #[test]
    fn split_four_byte_sequence_survives_read_boundary() {
        let emoji = "🦀".as_bytes();
        let mut carry = Vec::new();
        assert_eq!(decode_input_chunk(&mut carry, &emoji[..3]), "");
        assert_eq!(carry, emoji[..3].to_vec());
        assert_eq!(decode_input_chunk(&mut carry, &emoji[3..]), "🦀");
        assert!(carry.is_empty());
    }

    #[test]
    fn invalid_byte_is_replaced_not_carried() {
        let mut carry = Vec::new();
        assert_eq!(decode_input_chunk(&mut carry, &[b'a', 0xff, b'b']), "a\u{fffd}b");
        assert!(carry.is_empty());
    }
}
