//! Cancellation source for the poll loop.
//!
//! Two independent paths stop a session:
//! - a space keypress read from a [`KeySource`] (drained on every check)
//! - an out-of-band interrupt flag set from a signal handler

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{debug, warn};

/// Why the operator stopped the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Space bar pressed
    Spacebar,
    /// Process interrupt (Ctrl+C or signal)
    Interrupt,
}

/// A single key observed by a [`KeySource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Char(char),
    /// Ctrl+C delivered as input instead of a signal (raw mode)
    Interrupt,
    Other,
}

/// Non-blocking single key peek
pub trait KeySource {
    /// Return the next pending key, or `None` if the buffer is empty
    fn poll_key(&mut self) -> io::Result<Option<KeyPress>>;
}

/// Shared flag raised by the interrupt handler
pub type InterruptFlag = Arc<AtomicBool>;

/// Install a Ctrl-C handler that raises the returned flag
pub fn setup_interrupt_handler() -> InterruptFlag {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);

    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install interrupt handler: {}", e);
    }

    interrupted
}

/// Combines the key source and the interrupt flag
pub struct CancellationSource<K> {
    keys: K,
    interrupted: InterruptFlag,
}

impl<K: KeySource> CancellationSource<K> {
    pub fn new(keys: K, interrupted: InterruptFlag) -> Self {
        Self { keys, interrupted }
    }

    /// Check for a pending cancellation without blocking
    ///
    /// Keys are consumed as they are inspected, so an old space press never
    /// triggers twice.
    pub fn poll_cancel_requested(&mut self) -> Option<CancelReason> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Some(CancelReason::Interrupt);
        }

        loop {
            match self.keys.poll_key() {
                Ok(Some(KeyPress::Char(' '))) => return Some(CancelReason::Spacebar),
                Ok(Some(KeyPress::Interrupt)) => {
                    self.interrupted.store(true, Ordering::SeqCst);
                    return Some(CancelReason::Interrupt);
                }
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(e) => {
                    debug!("Key poll failed: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Raw mode state of a [`TerminalKeys`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawMode {
    /// Not requested yet
    Pending,
    On,
    /// stdin is not a terminal
    Unavailable,
}

/// Terminal key source backed by crossterm events
///
/// Raw mode is entered on the first poll, so it only covers the poll loop,
/// and is left again on drop. When stdin is not a terminal the source stays
/// silent and only the interrupt flag can stop the session.
pub struct TerminalKeys {
    raw: RawMode,
}

impl TerminalKeys {
    pub fn new() -> Self {
        Self {
            raw: RawMode::Pending,
        }
    }

    /// Whether the terminal is currently in raw mode
    pub fn is_raw(&self) -> bool {
        self.raw == RawMode::On
    }

    fn ensure_raw(&mut self) -> bool {
        if self.raw == RawMode::Pending {
            self.raw = match terminal::enable_raw_mode() {
                Ok(()) => RawMode::On,
                Err(e) => {
                    warn!("Keyboard cancellation unavailable: {}", e);
                    RawMode::Unavailable
                }
            };
        }
        self.raw == RawMode::On
    }
}

impl Default for TerminalKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> io::Result<Option<KeyPress>> {
        if !self.ensure_raw() {
            return Ok(None);
        }
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let press = match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        KeyPress::Interrupt
                    }
                    KeyCode::Char(c) => KeyPress::Char(c),
                    _ => KeyPress::Other,
                };
                return Ok(Some(press));
            }
        }
        Ok(None)
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if self.is_raw() {
            terminal::disable_raw_mode().ok();
        }
    }
}
