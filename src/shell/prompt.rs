//! Interactive-shell prompt recognition.
//!
//! The regex in spec.md §4.3 is
//! `(?<num>[1-9]*)\W*\b(?<host>\w+):(?<directory>.*)\s(?<user>\$|#) $`,
//! anchored to the end of the buffer. `regex` uses `(?P<name>...)` for
//! named captures (the source platform's `(?<name>...)` syntax isn't
//! accepted here) and the trailing `$` is written `\z` to force an
//! absolute end-of-text anchor rather than an end-of-line one.
//!
//! Matching is performed against the last line of the scanned buffer: a
//! shell prompt is by construction the final, unterminated line the
//! device shell writes while idle, so scoping the match to it avoids the
//! (pathological, but possible) case of an earlier line in the same chunk
//! coincidentally matching the pattern.

use std::sync::OnceLock;

use regex::Regex;

fn prompt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<num>[1-9]*)\W*\b(?P<host>\w+):(?P<directory>.*)\s(?P<user>\$|#) \z")
            .expect("prompt regex is valid")
    })
}

/// A recognised shell prompt: the device is idle and waiting for input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub host: String,
    pub directory: String,
    /// `'$'` for unprivileged (`Adb`) access, `'#'` for `Root` access.
    pub user: char,
    /// The raw text of the matched prompt, e.g. `"host:/ $ "`.
    pub message: String,
}

impl Prompt {
    /// Attempts to recognise a prompt at the end of `buffer`. Returns
    /// `None` if the last line doesn't match.
    pub fn try_match(buffer: &str) -> Option<Prompt> {
        let last_line = buffer.rsplit('\n').next().unwrap_or(buffer);
        let last_line = last_line.strip_suffix('\r').unwrap_or(last_line);

        let caps = prompt_regex().captures(last_line)?;
        let host = caps.name("host")?.as_str().to_string();
        let directory = caps.name("directory")?.as_str().to_string();
        let user = caps.name("user")?.as_str().chars().next()?;
        let message = caps.get(0)?.as_str().to_string();

        Some(Prompt {
            host,
            directory,
            user,
            message,
        })
    }

    /// `true` if this prompt indicates root access (`#`).
    pub fn is_root(&self) -> bool {
        self.user == '#'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_unprivileged_prompt() {
        let prompt = Prompt::try_match("\r\nhost:/ $ ").expect("should recognise prompt");
        assert_eq!(prompt.host, "host");
        assert_eq!(prompt.directory, "/");
        assert_eq!(prompt.user, '$');
        assert!(!prompt.is_root());
    }

    #[test]
    fn matches_root_prompt_with_nested_directory() {
        let prompt =
            Prompt::try_match("generic_x86:/data/local/tmp # ").expect("should recognise prompt");
        assert_eq!(prompt.host, "generic_x86");
        assert_eq!(prompt.directory, "/data/local/tmp");
        assert_eq!(prompt.user, '#');
        assert!(prompt.is_root());
    }

    #[test]
    fn does_not_match_mid_output_line() {
        assert!(Prompt::try_match("just some shell output\n").is_none());
    }

    #[test]
    fn does_not_match_without_trailing_space() {
        assert!(Prompt::try_match("host:/$").is_none());
    }

    #[test]
    fn scans_only_the_last_line_of_a_multi_line_buffer() {
        let prompt = Prompt::try_match("total 4\ndrwxr-xr-x\nhost:/sdcard $ ").unwrap();
        assert_eq!(prompt.directory, "/sdcard");
    }
}
