//! Comma splitting for list-typed values.
//!
//! Elements are separated by `,`. Inside an element `\,` stands for a literal
//! comma and `\\` for a literal backslash; any other backslash is kept as is,
//! so unescaped paths like `C:\temp` pass through untouched.

const SEPARATOR: char = ',';
const ESCAPE: char = '\\';

/// Split `raw` on unescaped commas and resolve `\,` and `\\` inside each
/// element.
///
/// An empty input yields no elements. Trailing empty elements are dropped,
/// leading and inner ones are kept.
pub fn split_escaped(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(next @ (SEPARATOR | ESCAPE)) => current.push(next),
                Some(other) => {
                    current.push(ESCAPE);
                    current.push(other);
                }
                None => current.push(ESCAPE),
            },
            SEPARATOR => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

/// Escape backslashes and separators inside one element so it survives
/// [`split_escaped`].
pub fn escape_element(element: &str) -> String {
    let mut out = String::with_capacity(element.len());
    for c in element.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}
