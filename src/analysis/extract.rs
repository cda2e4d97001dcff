//! Reference extraction from formula text.
//!
//! A reference is written `"<datagroup>"!"<key>"!"<context>"` where the context
//! is `current` or `pf`. Text that does not fully match is skipped without
//! error; the missing-dependency check downstream catches most of what a
//! mangled reference leaves behind.

use crate::store::{Context, DependencyList, DependencyRef};

/// A reference as written in the formula, before fund qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReference<'a> {
    pub datagroup: &'a str,
    pub key: &'a str,
    pub context: Context,
}

/// Left-to-right, non-overlapping scan over a formula.
pub struct ReferenceScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> ReferenceScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Attempts a full match starting at the quote at `start`.
    /// Returns the reference and the offset just past its closing quote.
    fn match_at(&self, start: usize) -> Option<(RawReference<'a>, usize)> {
        let (datagroup, after) = quoted_segment(self.text, start)?;
        let after = expect_bang(self.text, after)?;
        let (key, after) = quoted_segment(self.text, after)?;
        let after = expect_bang(self.text, after)?;
        let (tag, end) = quoted_segment(self.text, after)?;
        let context = Context::from_tag(tag)?;
        Some((RawReference { datagroup, key, context }, end))
    }
}

impl<'a> Iterator for ReferenceScanner<'a> {
    type Item = RawReference<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(offset) = self.text[self.pos..].find('"') {
            let start = self.pos + offset;
            if let Some((reference, end)) = self.match_at(start) {
                self.pos = end;
                return Some(reference);
            }
            // No match anchored here; the next candidate is the next quote.
            self.pos = start + 1;
        }
        self.pos = self.text.len();
        None
    }
}

/// Reads `"<one or more non-quote chars>"` at `start`.
fn quoted_segment(text: &str, start: usize) -> Option<(&str, usize)> {
    let rest = text.get(start..)?.strip_prefix('"')?;
    let len = rest.find('"')?;
    if len == 0 {
        return None;
    }
    let body_start = start + 1;
    Some((&text[body_start..body_start + len], body_start + len + 1))
}

fn expect_bang(text: &str, at: usize) -> Option<usize> {
    (text.as_bytes().get(at) == Some(&b'!')).then_some(at + 1)
}

/// Extracts every dependency reference from `formula`, qualified with `fund_id`.
///
/// Duplicates are kept in formula order. An absent formula yields nothing.
pub fn extract(formula: Option<&str>, fund_id: &str) -> DependencyList {
    let Some(text) = formula else {
        return DependencyList::new();
    };

    ReferenceScanner::new(text)
        .map(|r| DependencyRef {
            target: format!("{}!{}!{}!{}", fund_id, r.datagroup, r.key, r.context.tag()),
            expected: r.context,
        })
        .collect()
}
