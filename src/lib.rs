// PhotonWarrior28 reader - shared library
// Cancellation, console output and the session controller

pub mod cancel;
pub mod display;
pub mod session;

pub use cancel::{
    setup_interrupt_handler, CancelReason, CancellationSource, InterruptFlag, KeyPress, KeySource,
    TerminalKeys,
};
pub use display::{ConsoleDisplay, StatusDisplay};
pub use session::{
    SessionConfig, SessionController, SessionError, SessionOutcome, SessionState, StopReason,
};
