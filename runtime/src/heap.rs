//! Instance arena and intern caches
//!
//! Every runtime object lives in one `Vec` and is addressed by an
//! [`InstanceId`]; comparing ids is the language's identity test. Integer,
//! Float and String literals go through value caches so equal values share an
//! id, and the two Boolean instances are allocated once up front.

use compiler::{BuiltinClasses, ClassId};
use fxhash::FxHashMap;
use indexmap::IndexMap;
use log::trace;
use num_bigint::BigInt;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Every instance id up to the heap's limit is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("heap exhausted after {0} instances")]
pub struct HeapExhausted(pub usize);

pub type HeapResult<T> = Result<T, HeapExhausted>;

/// A variable, field or argument: `None` is `null`
pub type Value = Option<InstanceId>;

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceData {
    /// Generic instance with mutable fields, in declaration order root class first
    Object(IndexMap<String, Value>),
    Integer(BigInt),
    Float(f32),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub class: ClassId,
    pub data: InstanceData,
}

#[derive(Debug)]
pub struct Heap {
    instances: Vec<Instance>,
    builtins: BuiltinClasses,
    integers: FxHashMap<BigInt, InstanceId>,
    floats: FxHashMap<u32, InstanceId>,
    strings: FxHashMap<String, InstanceId>,
    true_id: InstanceId,
    false_id: InstanceId,
    /// Ids at or past this value are never handed out
    limit: u32,
}

/// Cache key for a float; all NaNs share one entry
fn float_key(value: f32) -> u32 {
    if value.is_nan() {
        f32::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl Heap {
    pub fn new(builtins: BuiltinClasses) -> Self {
        Self::with_limit(builtins, u32::MAX)
    }

    /// A heap that refuses to grow past `limit` instances, Booleans included
    pub fn with_limit(builtins: BuiltinClasses, limit: u32) -> Self {
        let boolean = |flag| Instance {
            class: builtins.boolean,
            data: InstanceData::Boolean(flag),
        };
        Self {
            instances: vec![boolean(true), boolean(false)],
            builtins,
            integers: FxHashMap::default(),
            floats: FxHashMap::default(),
            strings: FxHashMap::default(),
            true_id: InstanceId(0),
            false_id: InstanceId(1),
            limit,
        }
    }

    fn alloc(&mut self, class: ClassId, data: InstanceData) -> HeapResult<InstanceId> {
        let count = self.instances.len();
        let raw = u32::try_from(count)
            .ok()
            .filter(|&raw| raw < self.limit)
            .ok_or(HeapExhausted(count))?;
        self.instances.push(Instance { class, data });
        Ok(InstanceId(raw))
    }

    pub fn builtins(&self) -> &BuiltinClasses {
        &self.builtins
    }

    /// New generic instance; every field starts as `null`
    pub fn new_object<'a>(
        &mut self,
        class: ClassId,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> HeapResult<InstanceId> {
        let fields = fields.into_iter().map(|name| (name.to_string(), None)).collect();
        self.alloc(class, InstanceData::Object(fields))
    }

    pub fn integer(&mut self, value: BigInt) -> HeapResult<InstanceId> {
        if let Some(&id) = self.integers.get(&value) {
            trace!("intern hit for Integer {}", value);
            return Ok(id);
        }
        let id = self.alloc(self.builtins.integer, InstanceData::Integer(value.clone()))?;
        self.integers.insert(value, id);
        Ok(id)
    }

    pub fn float(&mut self, value: f32) -> HeapResult<InstanceId> {
        let key = float_key(value);
        if let Some(&id) = self.floats.get(&key) {
            trace!("intern hit for Float {}", value);
            return Ok(id);
        }
        let id = self.alloc(self.builtins.float, InstanceData::Float(value))?;
        self.floats.insert(key, id);
        Ok(id)
    }

    pub fn string(&mut self, value: &str) -> HeapResult<InstanceId> {
        if let Some(&id) = self.strings.get(value) {
            trace!("intern hit for String {:?}", value);
            return Ok(id);
        }
        let id = self.alloc(self.builtins.string, InstanceData::String(value.to_string()))?;
        self.strings.insert(value.to_string(), id);
        Ok(id)
    }

    pub fn boolean(&self, value: bool) -> InstanceId {
        if value {
            self.true_id
        } else {
            self.false_id
        }
    }

    pub fn get(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn get_mut(&mut self, id: InstanceId) -> &mut Instance {
        &mut self.instances[id.index()]
    }

    pub fn class_of(&self, id: InstanceId) -> ClassId {
        self.get(id).class
    }

    /// `Some(flag)` when `id` is one of the Boolean instances
    pub fn as_bool(&self, id: InstanceId) -> Option<bool> {
        match self.get(id).data {
            InstanceData::Boolean(flag) => Some(flag),
            _ => None,
        }
    }

    pub fn as_str(&self, id: InstanceId) -> Option<&str> {
        match &self.get(id).data {
            InstanceData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
