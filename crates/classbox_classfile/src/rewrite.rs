//! The constant rewriter.
//!
//! Rewrites every `Utf8` constant whose decoded text equals a given
//! identifier to a different identifier, producing a structurally valid
//! container. All cross-references in a class file address the constant pool
//! by index rather than by byte offset, so a rewrite that changes entry
//! lengths only needs to re-emit the pool region correctly; everything before
//! and after it is copied verbatim. The rewriter still *proves* consistency
//! by re-parsing its own output and fails rather than emit a corrupt
//! container.
//!
//! The operation is pure: it reads the input slice and returns a fresh
//! buffer, never touching shared state.

use classbox_foundation::{Error, Result};

use crate::mutf8;
use crate::pool::{ConstantPool, TAG_UTF8};
use crate::reader::ByteReader;
use crate::writer::ByteWriter;
use crate::MAGIC;

/// The result of a rewrite pass.
#[derive(Clone, Debug)]
pub struct Rewrite {
    /// The (possibly patched) container bytes.
    pub bytes: Vec<u8>,
    /// Number of constant entries that were replaced.
    pub replaced: usize,
}

/// Rewrites every `Utf8` constant equal to `from` into `to`.
///
/// Matching is by exact decoded content; entries that merely contain `from`
/// as a prefix or substring are left untouched. Replacement text may be
/// shorter, equal, or longer than the original. When no entry matches, the
/// input is returned byte-identical with `replaced == 0` — whether that is an
/// error is the caller's decision.
///
/// # Errors
/// Returns a malformed-class error if the container cannot be parsed, and a
/// redirection error if the replacement cannot be encoded in a `Utf8` entry
/// or the patched container fails the consistency re-parse.
pub fn rewrite_identifier(container: &[u8], from: &str, to: &str) -> Result<Rewrite> {
    let mut r = ByteReader::new(container);
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(Error::malformed(
            format!("bad magic number {magic:#010x}"),
            0,
        ));
    }
    r.skip(4)?; // minor/major version
    let pool = ConstantPool::parse(&mut r)?;

    // Pass 1: locate matching entries.
    let matches: Vec<_> = pool
        .utf8_entries()
        .filter(|(_, text, _)| *text == from)
        .map(|(_, _, span)| span)
        .collect();
    if matches.is_empty() {
        return Ok(Rewrite {
            bytes: container.to_vec(),
            replaced: 0,
        });
    }

    let encoded = mutf8::encode(to);
    let length = u16::try_from(encoded.len()).map_err(|_| {
        Error::redirection(format!(
            "replacement identifier encodes to {} bytes, exceeding the Utf8 entry limit",
            encoded.len()
        ))
    })?;

    // Pass 2: emit a fresh buffer, copying unaffected regions verbatim and
    // re-encoding each matched entry.
    let mut w = ByteWriter::new();
    let mut cursor = 0;
    for span in &matches {
        w.bytes(&container[cursor..span.start]);
        w.u8(TAG_UTF8);
        w.u16(length);
        w.bytes(&encoded);
        cursor = span.end;
    }
    w.bytes(&container[cursor..]);
    let bytes = w.into_bytes();

    verify_consistency(container, &bytes, &pool, from, to, matches.len())?;

    Ok(Rewrite {
        bytes,
        replaced: matches.len(),
    })
}

/// Proves the patched container is structurally consistent with the original.
fn verify_consistency(
    original: &[u8],
    patched: &[u8],
    old_pool: &ConstantPool,
    from: &str,
    to: &str,
    replaced: usize,
) -> Result<()> {
    let mut r = ByteReader::new(patched);
    r.skip(8)
        .map_err(|_| Error::redirection("patched container lost its header".to_string()))?;
    let new_pool = ConstantPool::parse(&mut r)
        .map_err(|e| Error::redirection(format!("patched constant pool does not re-parse: {e}")))?;

    if new_pool.count() != old_pool.count() {
        return Err(Error::redirection(format!(
            "patched pool declares {} slots, expected {}",
            new_pool.count(),
            old_pool.count()
        )));
    }
    if new_pool.count_utf8(from) != 0 {
        return Err(Error::redirection(format!(
            "patched pool still contains \"{from}\""
        )));
    }
    let expected_to = old_pool.count_utf8(to) + replaced;
    if new_pool.count_utf8(to) != expected_to {
        return Err(Error::redirection(format!(
            "patched pool holds {} occurrences of \"{to}\", expected {expected_to}",
            new_pool.count_utf8(to)
        )));
    }
    // The region after the pool must have been carried over untouched.
    let old_tail = original.len() - old_pool.end_offset();
    let new_tail = patched.len() - new_pool.end_offset();
    if old_tail != new_tail {
        return Err(Error::redirection(format!(
            "trailing region shifted inconsistently ({old_tail} bytes became {new_tail})"
        )));
    }
    Ok(())
}
