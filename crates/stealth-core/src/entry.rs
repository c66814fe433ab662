//! Digit buffer behind the passcode overlay

use stealth_params::PASSCODE_LENGTH;
use zeroize::Zeroizing;

/// Digits typed so far, wiped on every clear
pub struct PasscodeEntry {
    digits: Zeroizing<String>,
}

impl PasscodeEntry {
    /// Empty buffer
    pub fn new() -> Self {
        Self {
            digits: Zeroizing::new(String::with_capacity(PASSCODE_LENGTH)),
        }
    }

    /// Append a digit. Returns `false` for non-digits or a full buffer.
    pub fn push_digit(&mut self, digit: u8) -> bool {
        if digit > 9 || self.is_complete() {
            return false;
        }
        self.digits.push(char::from(b'0' + digit));
        true
    }

    /// Drop the last digit
    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    /// Wipe the buffer
    pub fn clear(&mut self) {
        // Zeroizing only wipes on drop, so replace rather than truncate.
        self.digits = Zeroizing::new(String::with_capacity(PASSCODE_LENGTH));
    }

    /// Digits entered
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Whether no digit is entered
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Whether a full passcode is entered
    pub fn is_complete(&self) -> bool {
        self.digits.len() >= PASSCODE_LENGTH
    }

    /// Move the digits out, leaving the buffer empty
    pub fn take(&mut self) -> Zeroizing<String> {
        std::mem::replace(
            &mut self.digits,
            Zeroizing::new(String::with_capacity(PASSCODE_LENGTH)),
        )
    }
}

impl Default for PasscodeEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PasscodeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasscodeEntry")
            .field("len", &self.digits.len())
            .finish()
    }
}
