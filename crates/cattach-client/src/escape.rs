//! Local disconnect gesture detection.
//!
//! Recognizes the escape character (default `~`) typed at the start of a
//! line, followed by `.`, as a request to end the session without
//! signaling the remote side. Anything else passes through unchanged;
//! a swallowed escape character is flushed as soon as the gesture fails
//! to complete.
//!
//! Detection compares whole input chunks against single characters. A
//! read that returns the escape character bundled with more bytes (e.g. a
//! pasted block starting with `~`) is forwarded verbatim and the gesture
//! is simply not recognized for that chunk. This is a known limitation of
//! the chunk-level match; interactive keystrokes arrive one byte per read
//! in raw mode.

use cattach_core::constants::GESTURE_CONFIRM_CHAR;

/// Result of processing one input chunk through the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureAction {
    /// Forward these chunks to the remote side, in order.
    ///
    /// Usually one chunk; two when a previously swallowed escape
    /// character is flushed ahead of the current chunk.
    Forward(Vec<Vec<u8>>),
    /// Escape character seen at line start; swallowed, nothing forwarded.
    Armed,
    /// The disconnect gesture completed.
    Disconnect,
}

/// State machine recognizing the disconnect gesture.
#[derive(Debug)]
pub struct EscapeGesture {
    escape: u8,
    at_line_start: bool,
    armed: bool,
}

impl EscapeGesture {
    /// Create a detector for the given escape character.
    pub fn new(escape: u8) -> Self {
        Self {
            escape,
            at_line_start: false,
            armed: false,
        }
    }

    /// Process one chunk of local input.
    pub fn process(&mut self, chunk: Vec<u8>) -> GestureAction {
        if self.armed {
            // Armed state is cleared by the very next chunk, whatever it is.
            self.armed = false;
            if chunk == [GESTURE_CONFIRM_CHAR] {
                return GestureAction::Disconnect;
            }
            self.at_line_start = chunk == b"\r";
            return GestureAction::Forward(vec![vec![self.escape], chunk]);
        }

        if self.at_line_start && chunk == [self.escape] {
            self.armed = true;
            return GestureAction::Armed;
        }

        self.at_line_start = chunk == b"\r";
        GestureAction::Forward(vec![chunk])
    }

    /// True while an escape character is swallowed awaiting confirmation.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
