//! Hybrid array+hash tables.
//!
//! Dense positive-integer keys live in the array part; everything else goes
//! to an insertion-ordered hash part, which is what keeps `next` stable while
//! unrelated keys come and go. Storing nil deletes; deletes in the hash part
//! are tombstoned so an iteration in progress never loses its position.
//!
//! Weak modes (`__mode` containing `k` and/or `v`) are latched when the
//! metatable is set. Weak slots hold `rc::Weak` handles: a dead referent
//! reads as absent immediately, and the storage is reclaimed on the next
//! mutation of the table.

use crate::error::LuaError;
use crate::string::{lua_hash, LuaStr};
use crate::value::{Value, WeakRef};
use crate::varargs::Varargs;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A normalized table key. Int-valued floats normalize to `Int`, so `t[3]`
/// and `t[3.0]` are the same slot; reference types key by identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableKey {
    Int(i32),
    /// Non-integral finite double, by bit pattern.
    Num(u64),
    Bool(bool),
    Str(Rc<LuaStr>),
    /// Reference value, by address identity.
    Obj(usize),
}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TableKey::Int(i) => {
                state.write_u8(0);
                state.write_i32(*i);
            }
            TableKey::Num(b) => {
                state.write_u8(1);
                state.write_u64(*b);
            }
            TableKey::Bool(b) => {
                state.write_u8(2);
                state.write_u8(*b as u8);
            }
            TableKey::Str(s) => {
                state.write_u8(3);
                state.write_u32(LuaStr::hash(s));
            }
            TableKey::Obj(a) => {
                state.write_u8(4);
                state.write_usize(*a);
            }
        }
    }
}

/// Borrowed lookup key for string slots, avoiding an allocation per lookup.
struct StrKey<'a>(&'a [u8]);

impl Hash for StrKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(3);
        state.write_u32(lua_hash(self.0));
    }
}

impl indexmap::Equivalent<TableKey> for StrKey<'_> {
    fn equivalent(&self, key: &TableKey) -> bool {
        matches!(key, TableKey::Str(s) if s.as_bytes() == self.0)
    }
}

/// How the original key value is retained for iteration.
#[derive(Clone, Debug)]
enum KeyAnchor {
    /// Scalar or string key; the `TableKey` itself reconstructs the value.
    None,
    Strong(Value),
    Weak(WeakRef),
}

#[derive(Clone, Debug)]
enum Slot {
    Strong(Value),
    Weak(WeakRef),
}

#[derive(Clone, Debug)]
struct Entry {
    key: KeyAnchor,
    value: Slot,
}

impl Entry {
    /// The stored value; nil for tombstones and dead weak references.
    fn value(&self) -> Value {
        if let KeyAnchor::Weak(w) = &self.key {
            if w.is_dead() {
                return Value::Nil;
            }
        }
        match &self.value {
            Slot::Strong(v) => v.clone(),
            Slot::Weak(w) => w.upgrade().unwrap_or(Value::Nil),
        }
    }

    /// The key as a value, reconstructed from the normalized key or the
    /// anchor; nil when a weak key has died.
    fn key_value(&self, key: &TableKey) -> Value {
        match &self.key {
            KeyAnchor::None => match key {
                TableKey::Int(i) => Value::int(*i),
                TableKey::Num(b) => Value::Num(f64::from_bits(*b)),
                TableKey::Bool(b) => Value::Bool(*b),
                TableKey::Str(s) => Value::Str(Rc::clone(s)),
                TableKey::Obj(_) => Value::Nil,
            },
            KeyAnchor::Strong(v) => v.clone(),
            KeyAnchor::Weak(w) => w.upgrade().unwrap_or(Value::Nil),
        }
    }

    fn is_dead(&self) -> bool {
        let key_dead = matches!(&self.key, KeyAnchor::Weak(w) if w.is_dead());
        let value_dead = matches!(&self.value, Slot::Weak(w) if w.is_dead());
        key_dead || value_dead
    }
}

pub struct Table {
    array: Vec<Value>,
    hash: IndexMap<TableKey, Entry>,
    metatable: Option<Value>,
    weak_keys: bool,
    weak_values: bool,
}

/// Weak flags from a metatable's `__mode` value.
pub fn mode_flags(mode: &Value) -> (bool, bool) {
    match mode {
        Value::Str(s) => {
            let b = s.as_bytes();
            (b.contains(&b'k'), b.contains(&b'v'))
        }
        _ => (false, false),
    }
}

impl Table {
    pub fn new() -> Table {
        Table::with_capacity(0, 0)
    }

    pub fn with_capacity(narray: usize, nhash: usize) -> Table {
        Table {
            array: Vec::with_capacity(narray),
            hash: IndexMap::with_capacity(nhash),
            metatable: None,
            weak_keys: false,
            weak_values: false,
        }
    }

    /// Build a list-like table from a sequence of values.
    pub fn from_values(vals: impl IntoIterator<Item = Value>) -> Table {
        let mut t = Table::new();
        for v in vals {
            t.array.push(v);
        }
        t
    }

    /// Build a table from key/value pairs, ignoring invalid keys.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Table {
        let mut t = Table::new();
        for (k, v) in pairs {
            let _ = t.rawset(&k, v);
        }
        t
    }

    // ---- metatable ----

    pub fn get_metatable(&self) -> Option<Value> {
        self.metatable.clone()
    }

    /// Install a metatable without touching the weak flags. Prefer
    /// `set_metatable_with_mode`, which latches `__mode`; this exists for
    /// callers that have not yet read the mode (or are clearing).
    pub fn set_metatable(&mut self, mt: Option<Value>) {
        self.metatable = mt;
    }

    /// Install a metatable and latch the weak flags read from its `__mode`.
    /// The flags are passed in rather than read here so a table may be its
    /// own metatable without aliasing a live borrow.
    pub fn set_metatable_with_mode(
        &mut self,
        mt: Option<Value>,
        weak_keys: bool,
        weak_values: bool,
    ) {
        self.metatable = mt;
        let changed = weak_keys != self.weak_keys || weak_values != self.weak_values;
        self.weak_keys = weak_keys;
        self.weak_values = weak_values;
        if changed {
            self.rebuild_slots();
        }
    }

    pub fn is_weak(&self) -> bool {
        self.weak_keys || self.weak_values
    }

    /// Rewrap every slot to match the current weak flags. Array storage is
    /// strong-only, so under weak values the array spills into the hash part.
    fn rebuild_slots(&mut self) {
        if self.weak_values {
            let spilled: Vec<Value> = std::mem::take(&mut self.array);
            for (i, v) in spilled.into_iter().enumerate() {
                if !v.is_nil() {
                    let key = TableKey::Int((i + 1) as i32);
                    let entry = Entry {
                        key: KeyAnchor::None,
                        value: self.wrap_value(v),
                    };
                    self.hash.insert(key, entry);
                }
            }
        }
        let keys: Vec<TableKey> = self.hash.keys().cloned().collect();
        for k in keys {
            let entry = self.hash.get(&k).cloned();
            if let Some(e) = entry {
                let key_val = e.key_value(&k);
                let val = e.value();
                if val.is_nil() {
                    continue;
                }
                let rewrapped = Entry {
                    key: self.anchor_for(&k, &key_val),
                    value: self.wrap_value(val),
                };
                self.hash.insert(k, rewrapped);
            }
        }
    }

    fn wrap_value(&self, v: Value) -> Slot {
        if self.weak_values {
            if let Some(w) = v.downgrade() {
                return Slot::Weak(w);
            }
        }
        Slot::Strong(v)
    }

    fn anchor_for(&self, key: &TableKey, key_val: &Value) -> KeyAnchor {
        match key {
            TableKey::Obj(_) => {
                if self.weak_keys {
                    match key_val.downgrade() {
                        Some(w) => KeyAnchor::Weak(w),
                        None => KeyAnchor::Strong(key_val.clone()),
                    }
                } else {
                    KeyAnchor::Strong(key_val.clone())
                }
            }
            _ => KeyAnchor::None,
        }
    }

    /// Drop entries whose weak key or value has died. Called on mutation of
    /// weak tables; reads treat dead entries as absent without removing them.
    fn sweep_dead(&mut self) {
        self.hash.retain(|_, e| !e.is_dead());
    }

    // ---- raw access ----

    fn key_as_int(key: &Value) -> Option<i32> {
        match key {
            Value::Int(i) => Some(*i),
            Value::Num(d) if *d == (*d as i32) as f64 => Some(*d as i32),
            _ => None,
        }
    }

    fn normalize_key(key: &Value) -> Option<TableKey> {
        match key {
            Value::Nil => None,
            Value::Bool(b) => Some(TableKey::Bool(*b)),
            Value::Int(i) => Some(TableKey::Int(*i)),
            Value::Num(d) => {
                if d.is_nan() {
                    None
                } else if *d == (*d as i32) as f64 {
                    Some(TableKey::Int(*d as i32))
                } else {
                    Some(TableKey::Num(d.to_bits()))
                }
            }
            Value::Str(s) => Some(TableKey::Str(Rc::clone(s))),
            other => other.obj_addr().map(TableKey::Obj),
        }
    }

    /// Read `t[key]` without metamethods. Missing keys (and invalid ones)
    /// read as nil.
    pub fn rawget(&self, key: &Value) -> Value {
        if !self.weak_values {
            if let Some(i) = Self::key_as_int(key) {
                if i >= 1 && (i as usize) <= self.array.len() {
                    return self.array[i as usize - 1].clone();
                }
            }
        }
        match Self::normalize_key(key) {
            Some(nk) => self
                .hash
                .get(&nk)
                .map(Entry::value)
                .unwrap_or(Value::Nil),
            None => Value::Nil,
        }
    }

    pub fn rawget_int(&self, i: i32) -> Value {
        if !self.weak_values && i >= 1 && (i as usize) <= self.array.len() {
            return self.array[i as usize - 1].clone();
        }
        self.hash
            .get(&TableKey::Int(i))
            .map(Entry::value)
            .unwrap_or(Value::Nil)
    }

    pub fn rawget_str(&self, s: &str) -> Value {
        self.hash
            .get(&StrKey(s.as_bytes()))
            .map(Entry::value)
            .unwrap_or(Value::Nil)
    }

    /// Write `t[key] = value` without metamethods. Nil deletes; nil and NaN
    /// keys are rejected.
    pub fn rawset(&mut self, key: &Value, value: Value) -> Result<(), LuaError> {
        if key.is_nil() {
            return Err(LuaError::msg("table index is nil"));
        }
        if matches!(key, Value::Num(d) if d.is_nan()) {
            return Err(LuaError::msg("table index is NaN"));
        }
        if self.is_weak() {
            self.sweep_dead();
        }

        if !self.weak_values {
            if let Some(i) = Self::key_as_int(key) {
                if i >= 1 {
                    let idx = (i - 1) as usize;
                    if idx < self.array.len() {
                        self.array[idx] = value;
                        return Ok(());
                    }
                    if idx == self.array.len() {
                        if value.is_nil() {
                            return Ok(());
                        }
                        self.array.push(value);
                        self.migrate_from_hash();
                        return Ok(());
                    }
                }
            }
        }

        let nk = Self::normalize_key(key).expect("validated above");
        if value.is_nil() {
            // Tombstone rather than remove, so iteration keeps its position.
            if let Some(e) = self.hash.get_mut(&nk) {
                e.key = KeyAnchor::None;
                e.value = Slot::Strong(Value::Nil);
            }
        } else {
            let entry = Entry {
                key: self.anchor_for(&nk, key),
                value: self.wrap_value(value),
            };
            self.hash.insert(nk, entry);
        }
        Ok(())
    }

    pub fn rawset_int(&mut self, i: i32, value: Value) {
        let _ = self.rawset(&Value::int(i), value);
    }

    pub fn rawset_str(&mut self, s: &str, value: Value) {
        let _ = self.rawset(&Value::str(s), value);
    }

    /// Pull consecutive integer keys out of the hash part after an append
    /// extended the array.
    fn migrate_from_hash(&mut self) {
        loop {
            let next = TableKey::Int(self.array.len() as i32 + 1);
            match self.hash.shift_remove(&next) {
                Some(e) => {
                    let v = e.value();
                    if v.is_nil() {
                        break;
                    }
                    self.array.push(v);
                }
                None => break,
            }
        }
    }

    // ---- length ----

    /// A border of the table: some `n` with `t[n] ~= nil` and `t[n+1] == nil`.
    /// Dense tables report their element count.
    pub fn length(&self) -> i32 {
        if self.array.is_empty() {
            // Degenerate storage (fresh table, or spilled weak table): probe.
            let mut n = 0i32;
            while !self.rawget_int(n + 1).is_nil() {
                n += 1;
            }
            return n;
        }
        if !self.array.last().unwrap().is_nil() {
            return self.array.len() as i32;
        }
        // Binary search for a non-nil/nil boundary inside the array part.
        let mut lo = 0usize;
        let mut hi = self.array.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.array[mid].is_nil() {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo as i32
    }

    // ---- iteration ----

    /// The first live hash pair at or after position `from`.
    fn hash_pair_from(&self, from: usize) -> Option<(Value, Value)> {
        for (k, e) in self.hash.iter().skip(from) {
            let v = e.value();
            if !v.is_nil() {
                let kv = e.key_value(k);
                if !kv.is_nil() {
                    return Some((kv, v));
                }
            }
        }
        None
    }

    /// The pair following `key`, or `None` at the end. `key` nil starts the
    /// iteration. An unknown key is an error, as in `next`.
    pub fn next(&self, key: &Value) -> Result<Option<(Value, Value)>, LuaError> {
        if key.is_nil() {
            for (i, v) in self.array.iter().enumerate() {
                if !v.is_nil() {
                    return Ok(Some((Value::int((i + 1) as i32), v.clone())));
                }
            }
            return Ok(self.hash_pair_from(0));
        }

        if let Some(i) = Self::key_as_int(key) {
            if i >= 1 && (i as usize) <= self.array.len() {
                for j in (i as usize)..self.array.len() {
                    if !self.array[j].is_nil() {
                        return Ok(Some((Value::int((j + 1) as i32), self.array[j].clone())));
                    }
                }
                return Ok(self.hash_pair_from(0));
            }
        }

        let nk = Self::normalize_key(key).ok_or_else(|| LuaError::msg("invalid key to 'next'"))?;
        match self.hash.get_index_of(&nk) {
            Some(pos) => Ok(self.hash_pair_from(pos + 1)),
            None => Err(LuaError::msg("invalid key to 'next'")),
        }
    }

    /// The next integer-keyed pair after `i`, or `None` when `t[i+1]` is nil.
    pub fn inext(&self, i: i32) -> Option<(i32, Value)> {
        let k = i.checked_add(1)?;
        let v = self.rawget_int(k);
        if v.is_nil() {
            None
        } else {
            Some((k, v))
        }
    }

    // ---- list operations ----

    /// Insert `value` at `pos`, shifting `t[pos..]` up by one.
    pub fn insert(&mut self, pos: i32, value: Value) {
        let n = self.length();
        let mut i = n;
        while i >= pos {
            let v = self.rawget_int(i);
            self.rawset_int(i + 1, v);
            i -= 1;
        }
        self.rawset_int(pos, value);
    }

    /// Append to the end of the sequence.
    pub fn push(&mut self, value: Value) {
        let n = self.length();
        self.rawset_int(n + 1, value);
    }

    /// Remove and return `t[pos]`, shifting `t[pos+1..]` down by one.
    pub fn remove(&mut self, pos: i32) -> Value {
        let n = self.length();
        if pos < 1 || pos > n {
            return Value::Nil;
        }
        let removed = self.rawget_int(pos);
        for i in pos..n {
            let v = self.rawget_int(i + 1);
            self.rawset_int(i, v);
        }
        self.rawset_int(n, Value::Nil);
        removed
    }

    /// Join `t[i..=j]` with `sep`; every element must be a string or number.
    pub fn concat(&self, sep: &[u8], i: i32, j: i32) -> Result<Rc<LuaStr>, LuaError> {
        let mut out: Vec<u8> = Vec::new();
        let mut k = i;
        while k <= j {
            let v = self.rawget_int(k);
            match v.to_lua_string() {
                Some(s) => out.extend_from_slice(s.as_bytes()),
                None => {
                    return Err(LuaError::Message(format!(
                        "invalid value (at index {}) in table for 'concat'",
                        k
                    )))
                }
            }
            if k < j {
                out.extend_from_slice(sep);
            }
            k += 1;
        }
        Ok(LuaStr::new(out))
    }

    /// The values `t[i..=j]` as a multi-value list.
    pub fn unpack(&self, i: i32, j: i32) -> Varargs {
        if j < i {
            return Varargs::none();
        }
        let mut vals = Vec::with_capacity((j - i + 1) as usize);
        for k in i..=j {
            vals.push(self.rawget_int(k));
        }
        Varargs::of(vals)
    }

    /// Number of live entries in the hash part, for diagnostics.
    pub fn hash_len(&self) -> usize {
        self.hash.values().filter(|e| !e.value().is_nil()).count()
    }

    pub fn array_len(&self) -> usize {
        self.array.len()
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table(array={}, hash={})",
            self.array.len(),
            self.hash.len()
        )
    }
}
