//! Range bounds for value-ordered scans, derived from `MATCH` patterns.

use crate::glob::literal_prefix;

/// Bounds of a sorted value scan, in traversal order.
///
/// Ascending scans visit `start <= value < end`. Descending scans start
/// below `start` and walk down to `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRangeBounds {
    pub start: String,
    pub end: String,
}

impl ValueRangeBounds {
    /// Computes the tightest range covering every pattern.
    ///
    /// Returns `None` when any pattern has no literal prefix, in which case
    /// the caller must scan everything.
    pub fn derive<S: AsRef<str>>(patterns: &[S], desc: bool) -> Option<ValueRangeBounds> {
        let mut bounds: Option<ValueRangeBounds> = None;
        for pattern in patterns {
            let next = Self::for_pattern(pattern.as_ref(), desc)?;
            bounds = Some(match bounds {
                None => next,
                Some(acc) if desc => ValueRangeBounds {
                    start: acc.start.max(next.start),
                    end: acc.end.min(next.end),
                },
                Some(acc) => ValueRangeBounds {
                    start: acc.start.min(next.start),
                    end: acc.end.max(next.end),
                },
            });
        }
        bounds
    }

    fn for_pattern(pattern: &str, desc: bool) -> Option<ValueRangeBounds> {
        let prefix = literal_prefix(pattern);
        if prefix.is_empty() {
            return None;
        }
        let upper = successor(&prefix)?;
        Some(if desc {
            ValueRangeBounds {
                start: upper,
                end: prefix,
            }
        } else {
            ValueRangeBounds {
                start: prefix,
                end: upper,
            }
        })
    }
}

/// The smallest string greater than every string starting with `prefix`.
fn successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let bumped = (last as u32 + 1..=char::MAX as u32).find_map(char::from_u32);
        if let Some(next) = bumped {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}
