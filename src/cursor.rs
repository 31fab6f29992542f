//! Position-tracking reader over a string slice, shared by the version and
//! requirement parsers.

pub(crate) struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn input(&self) -> &'a str {
        self.input
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    pub(crate) fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    pub(crate) fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes one character if it is any of `set`.
    pub(crate) fn eat_any(&mut self, set: &[char]) -> bool {
        match self.peek() {
            Some(c) if set.contains(&c) => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Moves forward so that `rest` is what remains. `rest` must be a
    /// suffix of the unread input.
    pub(crate) fn skip_to(&mut self, rest: &'a str) {
        self.pos = self.input.len() - rest.len();
    }

    pub(crate) fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    pub(crate) fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    pub(crate) fn digits(&mut self) -> Option<u64> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return None;
        }
        digits.parse().ok()
    }

    /// Consumes the first of `words` the input starts with.
    pub(crate) fn keyword<T: Copy>(&mut self, words: &[(&str, T)]) -> Option<T> {
        let rest = self.rest();
        let (word, value) = words.iter().find(|(word, _)| rest.starts_with(word))?;
        self.pos += word.len();
        Some(*value)
    }

    /// Runs `f`, rewinding the cursor when it yields nothing.
    pub(crate) fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.pos;
        let result = f(self);
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    pub(crate) fn finish(&mut self) {
        self.pos = self.input.len();
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos == self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_while_and_peek() {
        let mut cursor = Cursor::new("django >=1.2");
        assert_eq!(cursor.take_while(|c| c.is_ascii_alphanumeric()), "django");
        cursor.skip_ws();
        assert_eq!(cursor.peek(), Some('>'));
        assert_eq!(cursor.peek_at(1), Some('='));
        assert_eq!(cursor.rest(), ">=1.2");
    }

    #[test]
    fn test_attempt_rewinds_on_none() {
        let mut cursor = Cursor::new("rc1");
        assert_eq!(cursor.attempt(|c| c.keyword(&[("dev", ())])), None);
        assert_eq!(cursor.rest(), "rc1");
        assert_eq!(cursor.attempt(|c| c.keyword(&[("rc", 1)])), Some(1));
        assert_eq!(cursor.digits(), Some(1));
        assert!(cursor.is_done());
    }

    #[test]
    fn test_eat_handles_multibyte() {
        let mut cursor = Cursor::new("é1");
        assert!(!cursor.eat('e'));
        assert!(cursor.eat('é'));
        assert!(cursor.eat_any(&['0', '1']));
        assert!(cursor.is_done());
    }

    #[test]
    fn test_skip_to_suffix() {
        let mut cursor = Cursor::new("~=1.4");
        let rest = cursor.rest().strip_prefix("~=").unwrap();
        cursor.skip_to(rest);
        assert_eq!(cursor.digits(), Some(1));
        assert!(cursor.eat('.'));
    }
}
