//! Segment splitting and command-name extraction.
//!
//! Segments are separated by `;`, `&&`, `||` and unquoted newlines. Within a
//! segment, `|` and `&` separate the commands of a pipeline or background
//! job. Both splits are quote-aware: delimiters inside a single- or
//! double-quoted string, or escaped with a backslash, do not split.

/// Shell keywords that may precede a command without being one.
const SHELL_KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "in", "!", "{", "}",
];

/// Split a command string into its `;` / `&&` / `||` / newline segments.
///
/// Empty segments are dropped. Unbalanced quotes are not reported here; they
/// surface as a tokenization failure in [`extract_commands`].
pub fn split_segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            _ if in_single || in_double => current.push(c),
            ';' | '\n' | '\r' => push_segment(&mut segments, &mut current),
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                push_segment(&mut segments, &mut current);
            }
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                push_segment(&mut segments, &mut current);
            }
            _ => current.push(c),
        }
    }
    push_segment(&mut segments, &mut current);

    segments
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Split one segment into the commands of its pipeline or background job.
///
/// Splits on unquoted `|` and `&`, whether or not they are surrounded by
/// spaces. `&` and `|` that belong to a redirection (`2>&1`, `&>file`,
/// `<&3`, `>|file`) do not split. Empty commands are dropped.
pub fn split_commands(segment: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut prev: Option<char> = None;
    let mut chars = segment.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            _ if in_single || in_double => current.push(c),
            '&' if matches!(prev, Some('>' | '<')) || chars.peek() == Some(&'>') => {
                current.push(c)
            }
            '|' if prev == Some('>') => current.push(c),
            '|' | '&' => push_segment(&mut commands, &mut current),
            _ => current.push(c),
        }
        prev = Some(c);
    }
    push_segment(&mut commands, &mut current);

    commands
}

/// Extract the base names of every command invoked in a single segment.
///
/// Each pipeline or background command contributes its first command word.
/// Returns `None` when any command cannot be tokenized (unbalanced quotes,
/// dangling escape). Flags, `VAR=value` assignments and shell keywords are
/// skipped; leading paths are stripped so `/usr/bin/node` yields `node`.
pub fn extract_commands(segment: &str) -> Option<Vec<String>> {
    let mut names = Vec::new();
    for command in split_commands(segment) {
        let tokens = shell_words::split(&command).ok()?;
        if let Some(name) = tokens.iter().find(|t| is_command_word(t)) {
            names.push(base_name(name).to_string());
        }
    }
    Some(names)
}

fn is_command_word(token: &str) -> bool {
    if SHELL_KEYWORDS.contains(&token) || token.starts_with('-') {
        return false;
    }
    !(token.contains('=') && !token.starts_with('='))
}

/// Strip any leading directory components.
fn base_name(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_chaining_operators() {
        assert_eq!(
            split_segments("ls -la && cat a.txt || echo no; pwd"),
            vec!["ls -la", "cat a.txt", "echo no", "pwd"]
        );
    }

    #[test]
    fn delimiters_inside_quotes_do_not_split() {
        assert_eq!(
            split_segments(r#"echo "foo;bar && baz" ; ls"#),
            vec![r#"echo "foo;bar && baz""#, "ls"]
        );
        assert_eq!(split_segments("echo 'a || b'"), vec!["echo 'a || b'"]);
    }

    #[test]
    fn escaped_semicolon_does_not_split() {
        assert_eq!(split_segments(r"echo a\;b"), vec![r"echo a\;b"]);
    }

    #[test]
    fn newlines_split_segments() {
        assert_eq!(split_segments("ls\nrm -rf /"), vec!["ls", "rm -rf /"]);
    }

    #[test]
    fn pipes_stay_in_one_segment() {
        assert_eq!(split_segments("ps aux | grep node"), vec!["ps aux | grep node"]);
    }

    #[test]
    fn extracts_every_command_of_a_pipeline() {
        assert_eq!(
            extract_commands("ps aux | grep node").unwrap(),
            vec!["ps", "grep"]
        );
    }

    #[test]
    fn strips_paths_and_skips_assignments() {
        assert_eq!(
            extract_commands("NODE_ENV=test /usr/bin/node server.js").unwrap(),
            vec!["node"]
        );
    }

    #[test]
    fn skips_keywords() {
        assert_eq!(extract_commands("if true").unwrap(), vec!["true"]);
        assert_eq!(extract_commands("then rm x").unwrap(), vec!["rm"]);
    }

    #[test]
    fn unbalanced_quotes_fail_tokenization() {
        assert!(extract_commands("echo 'unterminated").is_none());
    }

    #[test]
    fn pipes_and_background_split_without_spaces() {
        assert_eq!(split_commands("ls|rm x"), vec!["ls", "rm x"]);
        assert_eq!(split_commands("ls |rm -rf /"), vec!["ls", "rm -rf /"]);
        assert_eq!(split_commands("ls &rm x"), vec!["ls", "rm x"]);
        assert_eq!(extract_commands("echo hi |bash").unwrap(), vec!["echo", "bash"]);
    }

    #[test]
    fn redirections_do_not_split() {
        assert_eq!(
            split_commands("npm run dev 2>&1 | tail -n 5"),
            vec!["npm run dev 2>&1", "tail -n 5"]
        );
        assert_eq!(split_commands("npm test &>out.log"), vec!["npm test &>out.log"]);
        assert_eq!(split_commands("echo hi >|out.txt"), vec!["echo hi >|out.txt"]);
    }

    #[test]
    fn quoted_pipe_is_an_argument() {
        assert_eq!(split_commands("grep 'a|b' x.txt"), vec!["grep 'a|b' x.txt"]);
        assert_eq!(extract_commands(r#"echo "|" rm"#).unwrap(), vec!["echo"]);
    }

    #[test]
    fn background_operator_starts_new_command() {
        assert_eq!(
            extract_commands("npm run dev & node x.js").unwrap(),
            vec!["npm", "node"]
        );
    }
}
