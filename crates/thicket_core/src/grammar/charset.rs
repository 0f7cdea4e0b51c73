//! Character matchers.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CharRange {
    lo: char,
    hi: char,
    include: bool,
}

impl CharRange {
    fn contains(&self, c: char) -> bool {
        self.lo <= c && c <= self.hi
    }
}

/// Set of characters built from inclusion and exclusion ranges.
///
/// Ranges are applied in the order they were added and the last range containing a character decides
/// whether it matches; characters no range covers match only if the matcher was created as "any".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharMatcher {
    match_any: bool,
    ranges: Vec<CharRange>,
    single: Option<char>,
}

impl CharMatcher {
    pub fn single(c: char) -> Self {
        Self::range(c, c)
    }

    pub fn range(lo: char, hi: char) -> Self {
        let mut matcher = Self::empty();
        matcher.include_range(lo, hi);
        matcher
    }

    pub fn any() -> Self {
        Self {
            match_any: true,
            ranges: Vec::new(),
            single: None,
        }
    }

    pub fn one_of(chars: &str) -> Self {
        let mut matcher = Self::empty();
        matcher.include(chars);
        matcher
    }

    fn empty() -> Self {
        Self {
            match_any: false,
            ranges: Vec::new(),
            single: None,
        }
    }

    pub fn include(&mut self, chars: &str) {
        for c in chars.chars() {
            self.push(c, c, true);
        }
    }

    pub fn exclude(&mut self, chars: &str) {
        for c in chars.chars() {
            self.push(c, c, false);
        }
    }

    pub fn include_range(&mut self, lo: char, hi: char) {
        self.push(lo, hi, true);
    }

    pub fn exclude_range(&mut self, lo: char, hi: char) {
        self.push(lo, hi, false);
    }

    fn push(&mut self, lo: char, hi: char, include: bool) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.ranges.push(CharRange { lo, hi, include });
        self.single = match self.ranges.as_slice() {
            [r] if !self.match_any && r.include && r.lo == r.hi => Some(r.lo),
            _ => None,
        };
    }

    pub fn matches(&self, c: char) -> bool {
        if let Some(single) = self.single {
            return c == single;
        }
        self.ranges
            .iter()
            .rev()
            .find(|r| r.contains(c))
            .map_or(self.match_any, |r| r.include)
    }

    /// The only character this matcher accepts, if it is a single-character matcher.
    pub fn single_char(&self) -> Option<char> {
        self.single
    }
}

impl fmt::Display for CharMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(c) = self.single {
            return write!(f, "{c:?}");
        }
        write!(f, "[")?;
        let mut first = true;
        if self.match_any {
            write!(f, "any")?;
            first = false;
        }
        for r in &self.ranges {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if !r.include {
                write!(f, "^")?;
            }
            if r.lo == r.hi {
                write!(f, "{:?}", r.lo)?;
            } else {
                write!(f, "{:?}-{:?}", r.lo, r.hi)?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_fast_path() {
        let m = CharMatcher::single('x');
        assert_eq!(m.single_char(), Some('x'));
        assert!(m.matches('x'));
        assert!(!m.matches('y'));
    }

    #[test]
    fn test_range_with_extra_include() {
        let mut m = CharMatcher::range('a', 'z');
        m.include_range('A', 'Z');
        assert!(m.matches('q'));
        assert!(m.matches('Q'));
        assert!(!m.matches('0'));
        assert_eq!(m.single_char(), None);
    }

    #[test]
    fn test_any_with_exclusions() {
        let mut m = CharMatcher::any();
        m.exclude("\"\\");
        assert!(m.matches('a'));
        assert!(m.matches('\n'));
        assert!(!m.matches('"'));
        assert!(!m.matches('\\'));
    }

    #[test]
    fn test_last_matching_range_wins() {
        let mut m = CharMatcher::range('a', 'z');
        m.exclude_range('m', 'p');
        m.include("n");
        assert!(m.matches('a'));
        assert!(!m.matches('m'));
        assert!(m.matches('n'));
        assert!(!m.matches('o'));
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let m = CharMatcher::range('9', '0');
        assert!(m.matches('5'));
    }

    #[test]
    fn test_display() {
        assert_eq!(CharMatcher::single('*').to_string(), "'*'");
        assert_eq!(CharMatcher::range('0', '9').to_string(), "['0'-'9']");
        let mut m = CharMatcher::any();
        m.exclude("*");
        assert_eq!(m.to_string(), "[any ^'*']");
    }

    #[test]
    fn test_equal_matchers_hash_equal() {
        use std::collections::HashSet;
        let set: HashSet<CharMatcher> = [CharMatcher::single('a'), CharMatcher::one_of("a")].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
