//! Shell prompt recognition.

use regex::Regex;

use crate::parser::normalize::strip_escapes;

/// Default prompt token: `uart:~$`, `shell:/dev#`, or a bare `$`, `#`, `>`.
pub const DEFAULT_PROMPT_PATTERN: &str = r"(?:[A-Za-z0-9_.@-]+:[^\s$#>]*)?[$#>]";

/// Recognizes the shell prompt.
///
/// Built from one unanchored pattern describing the prompt token. A prompt
/// line is the token alone; an echo line is the token followed by the typed
/// command.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::PromptMatcher;
///
/// let prompt = PromptMatcher::default();
/// assert!(prompt.ends_with_prompt("log - Logging\r\n\x1b[1;32muart:~$ \x1b[m"));
/// assert!(prompt.is_prompt_line("uart:~$"));
/// assert_eq!(prompt.echoed_command("uart:~$ log --help"), Some("log --help"));
/// assert!(!prompt.ends_with_prompt("Subcommands:\n  go  :Resume"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    line: Regex,
    echo: Regex,
}

impl PromptMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            line: Regex::new(&format!(r"^(?:{pattern})\s*$"))?,
            echo: Regex::new(&format!(r"^(?:{pattern})\s+(\S.*)$"))?,
        })
    }

    /// Returns `true` when the last line of `buffer` is a bare prompt.
    pub fn ends_with_prompt(&self, buffer: &str) -> bool {
        let cleaned = strip_escapes(buffer);
        let last = cleaned.rsplit(['\n', '\r']).next().unwrap_or_default();
        self.is_prompt_line(last.trim())
    }

    /// Returns `true` when `buffer` ends with a bare prompt and holds reply
    /// text ahead of it.
    ///
    /// Prompt lines, echo lines and a bare echo of `probe` are not reply text,
    /// so a buffer holding only the shell's re-sent prompt does not count.
    pub fn ends_reply(&self, buffer: &str, probe: &str) -> bool {
        if !self.ends_with_prompt(buffer) {
            return false;
        }
        let probe = probe.trim();
        strip_escapes(buffer)
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|line| {
                line != probe && !self.is_prompt_line(line) && self.echoed_command(line).is_none()
            })
    }

    /// Returns `true` when `line` is nothing but a prompt.
    pub fn is_prompt_line(&self, line: &str) -> bool {
        self.line.is_match(line.trim())
    }

    /// Returns the command typed after a prompt, if `line` is an echo line.
    pub fn echoed_command<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.echo
            .captures(line.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_end())
    }
}

impl Default for PromptMatcher {
    fn default() -> Self {
        // The default pattern is a compile-time constant covered by tests.
        Self::new(DEFAULT_PROMPT_PATTERN).expect("static regex must compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_variants() {
        let prompt = PromptMatcher::default();
        for line in ["uart:~$ ", "uart:~$", "shell:/dev# ", "$ ", "> ", "#"] {
            assert!(prompt.is_prompt_line(line), "{line:?}");
        }
        for line in [
            "Available commands:",
            "  log       :Commands for controlling logger",
            "devmem <address> [<width>]",
            "",
        ] {
            assert!(!prompt.is_prompt_line(line), "{line:?}");
        }
    }

    #[test]
    fn test_prompt_must_be_last_line() {
        let prompt = PromptMatcher::default();
        assert!(prompt.ends_with_prompt("help\r\nAvailable commands:\r\n  log  :Logging\r\nuart:~$ "));
        assert!(!prompt.ends_with_prompt("uart:~$ help\r\nAvailable commands:\r\n"));
        assert!(!prompt.ends_with_prompt(""));
    }

    #[test]
    fn test_reply_needs_text_before_prompt() {
        let prompt = PromptMatcher::default();
        assert!(!prompt.ends_reply("\x1b[1;32muart:~$ \x1b[m", "kernel --help"));
        assert!(!prompt.ends_reply("uart:~$ kernel --help\r\nuart:~$ ", "kernel --help"));
        assert!(!prompt.ends_reply("kernel --help\r\nuart:~$ ", "kernel --help"));
        assert!(prompt.ends_reply(
            "uart:~$ \r\nkernel --help\r\nkernel - Kernel commands\r\nuart:~$ ",
            "kernel --help"
        ));
        assert!(!prompt.ends_reply("uart:~$ \r\nkernel - Kernel commands\r\n", "kernel --help"));
    }

    #[test]
    fn test_echo_line_extraction() {
        let prompt = PromptMatcher::default();
        assert_eq!(prompt.echoed_command("uart:~$ help"), Some("help"));
        assert_eq!(
            prompt.echoed_command("\tuart:~$ log backend --help  "),
            Some("log backend --help")
        );
        assert_eq!(prompt.echoed_command("uart:~$ "), None);
        assert_eq!(prompt.echoed_command("log - Logging"), None);
    }

    #[test]
    fn test_custom_pattern() {
        let prompt = PromptMatcher::new(r"rtos>").unwrap();
        assert!(prompt.ends_with_prompt("done\nrtos> "));
        assert!(!prompt.ends_with_prompt("done\nuart:~$ "));
    }
}
