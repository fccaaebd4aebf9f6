//! POSIX shell quoting for command lines sent to a backend.

use std::borrow::Cow;

/// Quote `arg` for `sh`. Plain words are returned unchanged; anything else is
/// wrapped in single quotes with embedded quotes escaped.
#[must_use]
pub fn quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./:=@%+,".contains(&b));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Quote every argument and join with spaces.
#[must_use]
pub fn join<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
