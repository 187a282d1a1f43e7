//! Source file fingerprinting and line counting

use md5::{Digest, Md5};

/// MD5 of the raw file content as 32 lowercase hex characters
pub fn source_digest(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

/// Count physical lines the way line-oriented readers split them
///
/// `\n`, `\r\n` and a lone `\r` each end a line, and a final line without a
/// terminator still counts. Empty content has no lines.
pub fn count_lines(content: &[u8]) -> usize {
    let mut lines = 0;
    let mut open_line = false;
    let mut i = 0;

    while i < content.len() {
        match content[i] {
            b'\n' => {
                lines += 1;
                open_line = false;
            }
            b'\r' => {
                lines += 1;
                open_line = false;
                if content.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => open_line = true,
        }
        i += 1;
    }

    if open_line {
        lines += 1;
    }

    lines
}
