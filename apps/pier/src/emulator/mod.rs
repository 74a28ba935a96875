use thiserror::Error;
use tokio::sync::mpsc;

pub mod stdio;

/// Notifications the emulator delivers to the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorEvent {
    /// One input event's worth of text, as reported by the emulator.
    Input(String),
    /// The character grid changed dimensions.
    Resize { cols: u16, rows: u16 },
    /// The remote program set a window title.
    Title(String),
}

/// Notifications from the host the emulator is embedded in, kept as a
/// separate subscription so it can be torn down independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    WindowResized,
}

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("emulator io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("display container unavailable: {0}")]
    Container(String),
}

/// The character-grid component the session drives. Rendering and escape
/// sequence parsing live behind this seam; the bridge only writes remote
/// output into it and reacts to its notifications.
pub trait TerminalEmulator: Send {
    /// Render remote output. The text is a byte-preserving decode of the
    /// wire payload; code points 0..=255 map back to the original bytes.
    fn write(&mut self, text: &str) -> Result<(), EmulatorError>;

    /// Re-measure the display container and adopt its size, emitting a
    /// `Resize` event when the dimensions actually changed.
    fn fit(&mut self) -> Result<(), EmulatorError>;

    fn set_fullscreen(&mut self, enabled: bool) -> Result<(), EmulatorError>;

    /// Propagate a title to the hosting environment.
    fn set_title(&mut self, title: &str) -> Result<(), EmulatorError>;

    /// Release the display and any input hooks. The emulator is unusable
    /// afterwards.
    fn dispose(&mut self);
}

/// What a factory hands the controller when a session opens: the emulator
/// plus its two event subscriptions. Dropping the receivers is the
/// deregistration path on teardown.
pub struct EmulatorSubscription {
    pub emulator: Box<dyn TerminalEmulator>,
    pub events: mpsc::UnboundedReceiver<EmulatorEvent>,
    pub host_events: mpsc::UnboundedReceiver<HostEvent>,
}

/// Deferred construction: the session only instantiates an emulator once
/// the transport reports open.
pub trait EmulatorFactory: Send {
    fn open(&mut self) -> Result<EmulatorSubscription, EmulatorError>;
}
