//! The string concatenation buffer.
//!
//! Repeated `..` builds strings front-to-back and back-to-front; the buffer
//! keeps two byte vectors (the head stored reversed) so both `append` and
//! `prepend` are amortized O(bytes) and a chain of concatenations is O(n)
//! overall instead of O(n²).
//!
//! When `__concat` metamethod processing produces a value that is not a
//! string or number, the buffer switches to holding that value; the operator
//! surface keeps routing further concatenations through metamethod dispatch.

use crate::string::LuaStr;
use crate::value::Value;

#[derive(Default, Debug)]
pub struct Buffer {
    /// Prepended bytes, stored reversed.
    head: Vec<u8>,
    tail: Vec<u8>,
    /// A deferred non-buffer value; when set, `head`/`tail` are empty.
    value: Option<Value>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer::default()
    }

    /// A buffer holding `v` as its current value. `v` may be any value; a
    /// string or number is flushed to bytes on the next append or prepend.
    pub fn of_value(v: Value) -> Buffer {
        Buffer {
            head: Vec::new(),
            tail: Vec::new(),
            value: Some(v),
        }
    }

    /// The deferred value, when the buffer is in value mode.
    pub fn deferred(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// True when the buffer holds a deferred value that is not a string or
    /// number — concatenation must go through metamethod dispatch.
    pub fn needs_dispatch(&self) -> bool {
        matches!(&self.value, Some(v) if !v.is_string())
    }

    /// Replace the whole content with `v`.
    pub fn set_value(&mut self, v: Value) {
        self.head.clear();
        self.tail.clear();
        self.value = Some(v);
    }

    /// Move a string-or-number deferred value into the byte storage.
    /// No-op when already in byte mode; panics must not occur for
    /// non-convertible values, so callers check `needs_dispatch` first.
    fn flush_value(&mut self) {
        if let Some(v) = self.value.take() {
            if let Some(s) = v.to_lua_string() {
                self.tail.extend_from_slice(s.as_bytes());
            } else {
                // Not convertible; restore and let the caller dispatch.
                self.value = Some(v);
            }
        }
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.flush_value();
        self.tail.extend_from_slice(bytes);
    }

    pub fn append_str(&mut self, s: &LuaStr) {
        self.append_bytes(s.as_bytes());
    }

    /// Append a string-or-number value; numbers format per Lua 5.2.
    /// Returns false (leaving the buffer unchanged) for other types.
    pub fn append_value(&mut self, v: &Value) -> bool {
        match v.to_lua_string() {
            Some(s) => {
                self.append_str(&s);
                true
            }
            None => false,
        }
    }

    pub fn prepend_bytes(&mut self, bytes: &[u8]) {
        self.flush_value();
        self.head.extend(bytes.iter().rev());
    }

    pub fn prepend_str(&mut self, s: &LuaStr) {
        self.prepend_bytes(s.as_bytes());
    }

    pub fn prepend_value(&mut self, v: &Value) -> bool {
        match v.to_lua_string() {
            Some(s) => {
                self.prepend_str(&s);
                true
            }
            None => false,
        }
    }

    /// The accumulated content as one value: the deferred value if set,
    /// otherwise one string built from the byte storage.
    pub fn value(&self) -> Value {
        if let Some(v) = &self.value {
            return v.clone();
        }
        let mut bytes = Vec::with_capacity(self.head.len() + self.tail.len());
        bytes.extend(self.head.iter().rev());
        bytes.extend_from_slice(&self.tail);
        Value::Str(LuaStr::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.value.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(b: &Buffer) -> String {
        b.value().to_display()
    }

    #[test]
    fn appends_accumulate_left_to_right() {
        let mut b = Buffer::new();
        assert_eq!(text(&b), "");
        b.append_value(&Value::str("def"));
        assert_eq!(text(&b), "def");
        b.append_value(&Value::str("abc"));
        assert_eq!(text(&b), "defabc");
        b.append_value(&Value::int(123));
        assert_eq!(text(&b), "defabc123");
    }

    #[test]
    fn prepends_accumulate_right_to_left() {
        let mut b = Buffer::new();
        b.prepend_value(&Value::str("def"));
        assert_eq!(text(&b), "def");
        b.prepend_value(&Value::str("ghi"));
        assert_eq!(text(&b), "ghidef");
        b.prepend_value(&Value::int(123));
        assert_eq!(text(&b), "123ghidef");
    }

    #[test]
    fn mixed_appends_and_prepends() {
        let mut b = Buffer::new();
        b.append_value(&Value::str("def"));
        b.append_value(&Value::str("abc"));
        b.prepend_value(&Value::str("ghi"));
        assert_eq!(text(&b), "ghidefabc");
        b.prepend_value(&Value::int(123));
        assert_eq!(text(&b), "123ghidefabc");
        b.append_value(&Value::str("def"));
        b.prepend_value(&Value::str("ghi"));
        assert_eq!(text(&b), "ghi123ghidefabcdef");
    }

    #[test]
    fn set_value_resets_content() {
        let mut b = Buffer::new();
        b.append_value(&Value::str("abc"));
        b.set_value(Value::str("def"));
        assert_eq!(text(&b), "def");
        b.prepend_value(&Value::str("ghi"));
        b.append_value(&Value::str("abc"));
        assert_eq!(text(&b), "ghidefabc");
    }

    #[test]
    fn numeric_value_mode_flushes_on_use() {
        let mut b = Buffer::of_value(Value::int(123));
        assert!(!b.needs_dispatch());
        b.prepend_value(&Value::str("abc"));
        assert_eq!(text(&b), "abc123");
    }

    #[test]
    fn non_string_value_mode_requires_dispatch() {
        let t = Value::new_table();
        let b = Buffer::of_value(t.clone());
        assert!(b.needs_dispatch());
        assert_eq!(b.value(), t);
    }
}
