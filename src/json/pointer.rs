//! JSON Pointer (RFC 6901) helpers shared by the patch applier and the
//! schema walkers.

use std::borrow::Cow;

/// Escapes a single reference token: `~` becomes `~0` and `/` becomes `~1`.
pub fn escape(token: &str) -> Cow<'_, str> {
    if token.contains('~') || token.contains('/') {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Reverses [`escape`]. `~1` is decoded before `~0` so `~01` stays `~1`.
pub fn unescape(token: &str) -> Cow<'_, str> {
    if token.contains('~') {
        Cow::Owned(token.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Appends one token to a pointer.
pub fn push(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape(token))
}

/// Appends an array index to a pointer.
pub fn push_index(pointer: &str, index: usize) -> String {
    format!("{}/{}", pointer, index)
}

/// Splits a pointer into decoded tokens. The empty pointer addresses the
/// whole document and yields no tokens. A leading `#` (URI fragment form)
/// is accepted. Returns `None` when the pointer is neither empty nor starts
/// with `/`.
pub fn split(pointer: &str) -> Option<Vec<String>> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.is_empty() {
        return Some(Vec::new());
    }

    let rest = pointer.strip_prefix('/')?;
    Some(rest.split('/').map(|t| unescape(t).into_owned()).collect())
}

/// Normalizes a local `$ref` value (`#/definitions/Foo`) into a plain
/// pointer (`/definitions/Foo`). External references yield `None`.
pub fn from_local_ref(reference: &str) -> Option<&str> {
    reference.strip_prefix('#')
}
