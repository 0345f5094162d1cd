use std::borrow::Cow;

/// Render argv as a POSIX shell command line. Display only: processes are never spawned
/// through a shell.
pub(crate) fn quote_command_line<I, S>(argv: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, arg) in argv.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&quote_arg(arg.as_ref()));
    }
    out
}

fn quote_arg(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:,@%+".contains(&b))
    {
        return Cow::Borrowed(arg);
    }
    Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
}

/// Append `chunk` to `out` without letting `out` grow past `cap`.
pub(crate) fn push_limited(out: &mut Vec<u8>, chunk: &[u8], cap: usize) {
    if out.len() >= cap {
        return;
    }
    let remaining = cap.saturating_sub(out.len());
    let n = std::cmp::min(chunk.len(), remaining);
    out.extend_from_slice(&chunk[..n]);
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn plain_words_are_not_quoted() {
        assert_eq!(
            quote_command_line(["/usr/bin/php", "api.php", "--cmd", "dXNlcg"]),
            "/usr/bin/php api.php --cmd dXNlcg"
        );
    }

    #[test]
    fn metacharacters_and_empty_args_are_quoted() {
        assert_eq!(quote_command_line(["a b", ""]), "'a b' ''");
        assert_eq!(quote_command_line(["$(id)"]), "'$(id)'");
    }

    #[test]
    fn single_quotes_are_escaped() {
        assert_eq!(quote_command_line(["it's"]), r"'it'\''s'");
    }

    #[test]
    fn push_limited_caps_growth() {
        let mut buf = Vec::new();
        push_limited(&mut buf, b"hello", 3);
        push_limited(&mut buf, b"world", 3);
        assert_eq!(buf, b"hel");
    }
}
