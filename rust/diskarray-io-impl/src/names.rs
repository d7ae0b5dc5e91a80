//! Temporary file name generation.

use std::ffi::OsString;

/// Generates a temporary file name with a random alphanumeric suffix.
///
/// The name has the form `{prefix}-{random}`, where `random` is `len` characters long.
/// Uniqueness is not guaranteed here: callers create the file with `create_new` and
/// retry with a fresh name on collision.
pub fn generate_temp_file_name(prefix: &str, len: usize) -> OsString {
    let mut buf = OsString::with_capacity(prefix.len() + 1 + len);
    buf.push(prefix);
    buf.push("-");
    let mut rng = fastrand::Rng::new();
    let mut char_buf = [0u8; 4];
    for c in std::iter::repeat_with(|| rng.alphanumeric()).take(len) {
        buf.push(c.encode_utf8(&mut char_buf));
    }
    buf
}
