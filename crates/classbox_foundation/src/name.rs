//! Binary class-name utilities.
//!
//! Class files refer to classes by *internal* names with `/` separators
//! (`java/lang/System`), while diagnostics use the *dotted* form
//! (`java.lang.System`). These helpers convert between the two and validate
//! the internal form before it is used as a rewrite identifier.

/// Converts a dotted class name to its internal form.
///
/// `java.lang.System` becomes `java/lang/System`.
#[must_use]
pub fn to_internal_name(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// Converts an internal class name to its dotted form.
///
/// `java/lang/System` becomes `java.lang.System`.
#[must_use]
pub fn to_dotted_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Returns the simple (unqualified) name of an internal class name.
///
/// `java/lang/System` becomes `System`.
#[must_use]
pub fn simple_name(internal: &str) -> &str {
    internal.rsplit('/').next().unwrap_or(internal)
}

/// Checks whether a string is a plausible internal class name.
///
/// Segments must be non-empty and may not contain `.`, `;`, `[` or
/// whitespace. This is the subset of validity the rewriter relies on; the
/// JVM's full identifier rules are deliberately not replicated here.
#[must_use]
pub fn is_valid_internal_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.split('/').all(|segment| {
        !segment.is_empty()
            && !segment
                .chars()
                .any(|c| c == '.' || c == ';' || c == '[' || c.is_whitespace())
    })
}
