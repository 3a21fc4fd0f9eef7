//! Receiver adapters: pull-from-socket vs. push-to-receiver inversion.
//!
//! Modelled as the capability spec.md §9 describes — `{ add_output(line),
//! flush() }` — rather than the source's virtual-method inheritance
//! (`MultiLineReceiver`). [`MultiLineReceiver`] owns the accumulating
//! buffer and line-splitting logic and hands complete-line batches to a
//! closure; [`ConsoleOutputReceiver`] layers the shell-prompt-echo
//! filtering and pattern-matched error detection from spec.md §4.7 on top.

use crate::error::AdbError;

/// An output sink that consumes shell lines.
pub trait Receiver {
    /// Called once per complete line (no trailing newline).
    fn add_output(&mut self, line: &str);

    /// Called once the underlying stream has ended.
    fn flush(&mut self) {}
}

/// Accumulates partial input, splits on `\n`, and hands complete lines to
/// an implementation-supplied callback, retaining the unterminated tail
/// across calls.
pub struct MultiLineReceiver<F: FnMut(&[String])> {
    buffer: String,
    on_lines: F,
}

impl<F: FnMut(&[String])> MultiLineReceiver<F> {
    pub fn new(on_lines: F) -> Self {
        MultiLineReceiver {
            buffer: String::new(),
            on_lines,
        }
    }

    /// Feeds a chunk of raw bytes (decoded lossily as UTF-8) into the
    /// receiver, splitting on `\n` or `\r\n` and dispatching every
    /// complete line found so far.
    pub fn feed(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);

        let mut lines = Vec::new();
        loop {
            match self.buffer.find('\n') {
                Some(idx) => {
                    let mut line: String = self.buffer.drain(..=idx).collect();
                    line.pop(); // drop '\n'
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    lines.push(line);
                }
                None => break,
            }
        }

        if !lines.is_empty() {
            (self.on_lines)(&lines);
        }
    }

    /// Flushes any buffered, unterminated tail as a final line.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            (self.on_lines)(&[tail]);
        }
    }
}

/// Recognised shell-output error patterns and the error they map to.
const ERROR_PATTERNS: &[(&str, fn(String) -> AdbError)] = &[
    ("no such file or directory", AdbError::FileNotFound),
    ("not found", AdbError::FileNotFound),
    ("applet not found", AdbError::FileNotFound),
    ("unknown option", AdbError::UnknownOption),
    ("aborting.", AdbError::CommandAborting),
    ("permission denied", AdbError::PermissionDenied),
    ("access denied", AdbError::PermissionDenied),
];

/// A receiver for console-style shell output: filters out echoed prompt
/// lines and, on request, raises a typed [`AdbError`] when a line matches
/// one of the recognised patterns in spec.md §4.7/§7.
#[derive(Default)]
pub struct ConsoleOutputReceiver {
    lines: Vec<String>,
    throw_on_error: bool,
}

impl ConsoleOutputReceiver {
    pub fn new(throw_on_error: bool) -> Self {
        ConsoleOutputReceiver {
            lines: Vec::new(),
            throw_on_error,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Checks `line` against the recognised error patterns and returns the
    /// matching error, if any, without regard to `throw_on_error`.
    pub fn match_error(line: &str) -> Option<AdbError> {
        let lower = line.to_ascii_lowercase();
        for (pattern, make_error) in ERROR_PATTERNS {
            if lower.contains(pattern) {
                return Some(make_error(line.to_string()));
            }
        }
        None
    }

    /// Applies [`ConsoleOutputReceiver::match_error`] to `line` and raises
    /// it as an `Err` when `throw_on_error` is set.
    pub fn throw_on_error(&self, line: &str) -> Result<(), AdbError> {
        if !self.throw_on_error {
            return Ok(());
        }
        match Self::match_error(line) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_prompt_echo(line: &str) -> bool {
        line.starts_with('#') || line.starts_with('$')
    }
}

impl Receiver for ConsoleOutputReceiver {
    fn add_output(&mut self, line: &str) {
        if Self::is_prompt_echo(line) {
            return;
        }
        self.lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_receiver_splits_on_lf_and_crlf() {
        let mut lines = Vec::new();
        {
            let mut receiver = MultiLineReceiver::new(|batch| lines.extend_from_slice(batch));
            receiver.feed("first\r\nsecond\nthi");
            receiver.feed("rd\n");
        }
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn multi_line_receiver_retains_unterminated_tail_until_finish() {
        let mut lines = Vec::new();
        {
            let mut receiver = MultiLineReceiver::new(|batch| lines.extend_from_slice(batch));
            receiver.feed("no newline yet");
            assert!(lines.is_empty());
            receiver.finish();
        }
        assert_eq!(lines, vec!["no newline yet"]);
    }

    #[test]
    fn console_receiver_ignores_prompt_echo_lines() {
        let mut receiver = ConsoleOutputReceiver::new(false);
        receiver.add_output("# ls -la");
        receiver.add_output("$ pwd");
        receiver.add_output("/sdcard");
        assert_eq!(receiver.lines(), &["/sdcard".to_string()]);
    }

    #[test]
    fn console_receiver_matches_permission_denied() {
        let err = ConsoleOutputReceiver::match_error("/dev/test: permission denied").unwrap();
        assert!(matches!(err, AdbError::PermissionDenied(_)));
    }

    #[test]
    fn console_receiver_does_not_match_unrelated_output() {
        assert!(ConsoleOutputReceiver::match_error("Stay calm").is_none());
    }

    #[test]
    fn console_receiver_throw_on_error_respects_flag() {
        let quiet = ConsoleOutputReceiver::new(false);
        assert!(quiet.throw_on_error("Aborting.").is_ok());

        let loud = ConsoleOutputReceiver::new(true);
        assert!(loud.throw_on_error("Aborting.").is_err());
        assert!(loud.throw_on_error("Stay calm").is_ok());
    }

    #[test]
    fn all_documented_patterns_are_recognised() {
        let cases = [
            ("foo: not found", true),
            ("No such file or directory", true),
            ("applet not found", true),
            ("Unknown option -z", true),
            ("Aborting.", true),
            ("permission denied", true),
            ("access denied", true),
            ("totally fine output", false),
        ];
        for (line, should_match) in cases {
            assert_eq!(
                ConsoleOutputReceiver::match_error(line).is_some(),
                should_match,
                "line: {:?}",
                line
            );
        }
    }
}
