//! Session lifecycle: one emulator instance bound to one transport
//! connection, driven to completion by the two event streams.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::emulator::{
    EmulatorError, EmulatorEvent, EmulatorFactory, EmulatorSubscription, HostEvent,
    TerminalEmulator,
};
use crate::transport::{Transport, TransportError, TransportEvent};
use pier_proto::{decode_output, encode_data, encode_resize, WindowSize};

/// Written into the display when the transport closes, clean or abrupt
/// alike.
pub const SESSION_TERMINATED_NOTICE: &str = "Session terminated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("emulator error: {0}")]
    Emulator(#[from] EmulatorError),
}

/// Final observation of a finished session, returned to the caller instead
/// of parking the live session on any ambient global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub state: SessionState,
    pub size: Option<WindowSize>,
}

/// Binds an emulator to a transport and multiplexes their events.
///
/// The state machine is `Connecting -> Open -> Closed`; errors are
/// orthogonal and only logged. All mutation happens on the task driving
/// [`SessionController::run`], so the session record is never shared.
pub struct SessionController<T: Transport, F: EmulatorFactory> {
    transport: T,
    factory: F,
    state: SessionState,
    size: Option<WindowSize>,
    emulator: Option<Box<dyn TerminalEmulator>>,
    emulator_events: Option<mpsc::UnboundedReceiver<EmulatorEvent>>,
    host_events: Option<mpsc::UnboundedReceiver<HostEvent>>,
    notices: mpsc::UnboundedSender<String>,
}

enum Pending {
    Transport(Option<TransportEvent>),
    Emulator(EmulatorEvent),
    Host(HostEvent),
}

impl<T: Transport, F: EmulatorFactory> SessionController<T, F> {
    /// Create a controller in `Connecting`. The returned receiver carries
    /// out-of-band notices for the user; they are never terminal content.
    pub fn new(transport: T, factory: F) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (notices, notices_rx) = mpsc::unbounded_channel();
        (
            Self {
                transport,
                factory,
                state: SessionState::Connecting,
                size: None,
                emulator: None,
                emulator_events: None,
                host_events: None,
                notices,
            },
            notices_rx,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current dimensions, once the first resize has been observed.
    pub fn size(&self) -> Option<WindowSize> {
        self.size
    }

    /// Drive the session until the transport closes.
    pub async fn run(
        mut self,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Result<SessionSummary, SessionError> {
        while self.state != SessionState::Closed {
            let next = {
                let emulator_rx = &mut self.emulator_events;
                let host_rx = &mut self.host_events;
                tokio::select! {
                    event = transport_events.recv() => Pending::Transport(event),
                    Some(event) = recv_opt(emulator_rx) => Pending::Emulator(event),
                    Some(event) = recv_opt(host_rx) => Pending::Host(event),
                }
            };
            match next {
                Pending::Transport(Some(event)) => self.handle_transport_event(event).await?,
                // Sender gone without a close notification; same teardown.
                Pending::Transport(None) => {
                    self.handle_transport_event(TransportEvent::Closed).await?
                }
                Pending::Emulator(event) => self.handle_emulator_event(event).await?,
                Pending::Host(event) => self.handle_host_event(event)?,
            }
        }
        Ok(SessionSummary {
            state: self.state,
            size: self.size,
        })
    }

    /// Single dispatch point for everything the transport reports.
    pub async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<(), SessionError> {
        match event {
            TransportEvent::Open => match self.state {
                SessionState::Connecting => self.open_session()?,
                _ => debug!(state = ?self.state, "ignoring duplicate open"),
            },
            TransportEvent::Binary(bytes) => {
                if self.state != SessionState::Open {
                    debug!(state = ?self.state, len = bytes.len(), "dropping inbound bytes");
                    return Ok(());
                }
                let text = decode_output(&bytes);
                if let Some(emulator) = self.emulator.as_mut() {
                    emulator.write(&text)?;
                }
            }
            TransportEvent::Text(text) => {
                if self.state != SessionState::Open {
                    debug!(state = ?self.state, "dropping out-of-band notice");
                    return Ok(());
                }
                info!(notice = %text, "out-of-band notice");
                let _ = self.notices.send(text);
            }
            TransportEvent::Closed => {
                if self.state != SessionState::Closed {
                    self.close_session();
                }
            }
            TransportEvent::Error(info) => {
                // Logged only; teardown happens solely via Closed.
                warn!(state = ?self.state, error = %info, "transport error");
            }
        }
        Ok(())
    }

    /// Single dispatch point for the emulator's notifications.
    pub async fn handle_emulator_event(
        &mut self,
        event: EmulatorEvent,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            debug!(state = ?self.state, "dropping emulator event");
            return Ok(());
        }
        match event {
            EmulatorEvent::Input(text) => {
                self.transport.send(&encode_data(&text)).await?;
            }
            EmulatorEvent::Resize { cols, rows } => {
                self.size = Some(WindowSize { cols, rows });
                self.transport.send(&encode_resize(cols, rows)).await?;
                debug!(cols, rows, "resize frame sent");
            }
            EmulatorEvent::Title(title) => {
                if let Some(emulator) = self.emulator.as_mut() {
                    emulator.set_title(&title)?;
                }
            }
        }
        Ok(())
    }

    /// Host-window resize: re-fit only. A changed fit cascades into an
    /// emulator resize event and from there into an outbound frame.
    pub fn handle_host_event(&mut self, event: HostEvent) -> Result<(), SessionError> {
        if self.state != SessionState::Open {
            debug!(state = ?self.state, "dropping host event");
            return Ok(());
        }
        match event {
            HostEvent::WindowResized => {
                if let Some(emulator) = self.emulator.as_mut() {
                    emulator.fit()?;
                }
            }
        }
        Ok(())
    }

    fn open_session(&mut self) -> Result<(), SessionError> {
        let EmulatorSubscription {
            mut emulator,
            events,
            host_events,
        } = self.factory.open()?;
        emulator.fit()?;
        emulator.set_fullscreen(true)?;
        self.emulator = Some(emulator);
        self.emulator_events = Some(events);
        self.host_events = Some(host_events);
        self.state = SessionState::Open;
        info!("session open");
        Ok(())
    }

    fn close_session(&mut self) {
        if let Some(mut emulator) = self.emulator.take() {
            if let Err(err) = emulator.write(SESSION_TERMINATED_NOTICE) {
                warn!(error = %err, "failed to write termination notice");
            }
            emulator.dispose();
        }
        // Dropping the receivers deregisters both subscriptions.
        self.emulator_events = None;
        self.host_events = None;
        self.state = SessionState::Closed;
        info!("session closed");
    }
}

async fn recv_opt<E>(rx: &mut Option<mpsc::UnboundedReceiver<E>>) -> Option<E> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
