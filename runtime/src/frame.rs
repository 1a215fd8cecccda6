//! Activation records

use crate::heap::{InstanceId, Value};
use compiler::MethodId;
use fxhash::FxHashMap;
use source_map::{FileId, SourceLocation};

/// One entry of the interpreter's call stack
#[derive(Debug, Clone)]
pub struct Frame {
    /// `self` for the running body
    pub receiver: InstanceId,
    /// `None` for the main program
    pub method: Option<MethodId>,
    pub locals: FxHashMap<String, Value>,
    /// Statement or call site currently executing in this frame
    pub location: Option<SourceLocation>,
    /// File the running statements come from
    pub file: FileId,
}

impl Frame {
    pub fn main(receiver: InstanceId, file: FileId) -> Self {
        Self {
            receiver,
            method: None,
            locals: FxHashMap::default(),
            location: None,
            file,
        }
    }

    pub fn method(receiver: InstanceId, method: MethodId, file: FileId) -> Self {
        Self {
            receiver,
            method: Some(method),
            locals: FxHashMap::default(),
            location: None,
            file,
        }
    }

    pub fn is_main(&self) -> bool {
        self.method.is_none()
    }

    /// `Some(value)` when `name` is bound, even to `null`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.locals.get(name).copied()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    /// Overwrite an existing binding; false when `name` is unbound
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.locals.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
