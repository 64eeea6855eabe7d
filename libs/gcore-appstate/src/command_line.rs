/// Parsed process arguments, with slot `0` always the executable path.
pub struct CommandLine {
    args: Vec<String>,
}

impl CommandLine {
    /// Builds from an already-split POSIX-style `argv` (slot `0` is the
    /// executable path, exactly as the OS hands it to `main`).
    #[must_use]
    pub fn from_argv(argv: impl IntoIterator<Item = impl Into<String>>, split_pairs: bool) -> Self {
        let args: Vec<String> = argv.into_iter().map(Into::into).collect();
        Self {
            args: if split_pairs { split_pairs_into_slots(args) } else { args },
        }
    }

    /// Builds from a single unparsed Windows command-line string (which
    /// excludes the executable name); `exe_path` is synthesized into slot
    /// `0` from the queried executable path, the way the Windows shape
    /// requires.
    #[must_use]
    pub fn from_windows_command_line(command_line: &str, exe_path: impl Into<String>, split_pairs: bool) -> Self {
        let mut args = vec![exe_path.into()];
        args.extend(split_quoted_whitespace(command_line));
        Self {
            args: if split_pairs { split_pairs_into_slots(args) } else { args },
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.args.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.args.is_empty() }

    /// The `i`-th argument, or `None` past the end. Slot `0` is the
    /// executable path.
    #[must_use]
    pub fn enum_arg(&self, i: usize) -> Option<&str> { self.args.get(i).map(String::as_str) }

    /// Finds the first argument matching `pattern`, starting from slot `1`
    /// (slot `0` is never a candidate — it is the executable path, not an
    /// argument). `exact` requests a literal match; otherwise `pattern` is a
    /// `*`/`?` wildcard matched against the whole argument (not a substring
    /// search — a bare `"foo"` with `exact: false` still requires the whole
    /// argument to read `foo`, just as it would with `exact: true`; only an
    /// explicit `*` or `?` lets it match part of a longer argument).
    #[must_use]
    pub fn find_arg(&self, pattern: &str, exact: bool, case_sensitive: bool) -> Option<usize> {
        let needle = if case_sensitive { pattern.to_string() } else { pattern.to_lowercase() };
        self.args.iter().enumerate().skip(1).find_map(|(i, arg)| {
            let hay = if case_sensitive { arg.clone() } else { arg.to_lowercase() };
            let matched = if exact { hay == needle } else { wildcard_match(&needle, &hay) };
            matched.then_some(i)
        })
    }
}

/// Whole-string `*`/`?` wildcard match (`*` = any run of characters, `?` =
/// exactly one). Classic greedy two-pointer algorithm with backtracking to
/// the most recent `*`.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0_usize, 0_usize);
    let mut star: Option<usize> = None;
    let mut star_match = 0_usize;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star = Some(pi);
            star_match = ti;
            pi += 1;
        } else if let Some(star_pi) = star {
            pi = star_pi + 1;
            star_match += 1;
            ti = star_match;
        } else {
            return false;
        }
    }
    while pattern.get(pi) == Some(&'*') {
        pi += 1;
    }
    pi == pattern.len()
}

/// Whitespace-splits `s`, treating a double-quoted run as one token and
/// stripping the surrounding quotes.
fn split_quoted_whitespace(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in s.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            },
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            },
            c => {
                current.push(c);
                has_token = true;
            },
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Replaces every `key=value` argument with two consecutive slots.
/// Arguments without `=` pass through unchanged.
fn split_pairs_into_slots(args: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                out.push(key.to_string());
                out.push(value.to_string());
            },
            None => out.push(arg),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_shape_keeps_argv_zero_as_the_executable_path() {
        let cmd = CommandLine::from_argv(["/bin/foo", "--bar"], false);
        assert_eq!(cmd.enum_arg(0), Some("/bin/foo"));
        assert_eq!(cmd.find_arg("--bar", true, true), Some(1));
    }

    #[test]
    fn windows_shape_synthesizes_slot_zero_from_the_exe_path() {
        let cmd = CommandLine::from_windows_command_line("--flag \"quoted value\" tail", "C:\\foo.exe", false);
        assert_eq!(cmd.enum_arg(0), Some("C:\\foo.exe"));
        assert_eq!(cmd.enum_arg(1), Some("--flag"));
        assert_eq!(cmd.enum_arg(2), Some("quoted value"));
        assert_eq!(cmd.enum_arg(3), Some("tail"));
    }

    #[test]
    fn find_arg_is_case_insensitive_when_asked() {
        let cmd = CommandLine::from_argv(["/bin/foo", "--Bar"], false);
        assert_eq!(cmd.find_arg("--bar", true, false), Some(1));
        assert_eq!(cmd.find_arg("--bar", true, true), None);
    }

    #[test]
    fn find_arg_never_matches_slot_zero() {
        let cmd = CommandLine::from_argv(["/bin/foo"], false);
        assert_eq!(cmd.find_arg("/bin/foo", true, true), None);
    }

    #[test]
    fn non_exact_find_arg_does_not_match_a_bare_pattern_as_a_substring() {
        let cmd = CommandLine::from_argv(["/bin/foo", "xfooy"], false);
        assert_eq!(cmd.find_arg("foo", false, true), None, "a bare pattern must match the whole argument");
    }

    #[test]
    fn non_exact_find_arg_matches_an_explicit_wildcard_pattern() {
        let cmd = CommandLine::from_argv(["/bin/foo", "xfooy"], false);
        assert_eq!(cmd.find_arg("*foo*", false, true), Some(1));
        assert_eq!(cmd.find_arg("x???y", false, true), Some(1));
        assert_eq!(cmd.find_arg("x????y", false, true), None);
    }

    #[test]
    fn split_pairs_expands_key_value_arguments_into_two_slots() {
        let cmd = CommandLine::from_argv(["/bin/foo", "name=value", "bare"], true);
        assert_eq!(cmd.enum_arg(1), Some("name"));
        assert_eq!(cmd.enum_arg(2), Some("value"));
        assert_eq!(cmd.enum_arg(3), Some("bare"));
    }
}
