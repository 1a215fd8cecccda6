//! Class Registry
//!
//! Name-indexed store of every class plus the method arena. It is created
//! empty, populated by class discovery, and passed by reference into every
//! later pass; there is no global instance.

use crate::class_info::{BuiltinKind, ClassInfo, FieldInfo, MethodInfo, MethodKey};
use crate::error::{SemanticError, SemanticErrorKind, SemanticResult};
use crate::ids::{ClassId, MethodId};
use fxhash::FxHashMap;
use log::debug;
use source_map::SourceLocation;

/// Handles to the built-in classes, available once discovery validated them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinClasses {
    pub object: ClassId,
    pub boolean: ClassId,
    pub integer: ClassId,
    pub float: ClassId,
    pub string: ClassId,
}

impl BuiltinClasses {
    pub fn get(&self, kind: BuiltinKind) -> ClassId {
        match kind {
            BuiltinKind::Object => self.object,
            BuiltinKind::Boolean => self.boolean,
            BuiltinKind::Integer => self.integer,
            BuiltinKind::Float => self.float,
            BuiltinKind::String => self.string,
        }
    }

    pub fn is_numeric(&self, class: ClassId) -> bool {
        class == self.integer || class == self.float
    }
}

#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
    by_name: FxHashMap<String, ClassId>,
    methods: Vec<MethodInfo>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class; built-in names get their native representation
    pub fn register(&mut self, name: &str, location: SourceLocation) -> SemanticResult<ClassId> {
        if self.by_name.contains_key(name) {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateClass,
                format!("duplicate definition of class {}", name),
            )
            .at(location));
        }
        let id = ClassId::from_index(self.classes.len());
        let info = ClassInfo::new(id, name, location);
        debug!("registered class {} as {} (builtin: {:?})", name, id, info.builtin);
        self.classes.push(info);
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Fails unlocated; callers attach the reference site
    pub fn lookup(&self, name: &str) -> SemanticResult<ClassId> {
        self.get(name).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::UndefinedClass,
                format!("class {} has not yet been defined", name),
            )
        })
    }

    pub fn get(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.index()]
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        &self.classes[id.index()].name
    }

    /// All classes in registration order
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn builtin(&self, kind: BuiltinKind) -> Option<ClassId> {
        self.get(kind.name())
    }

    /// Every required built-in, or the first one missing
    pub fn builtins(&self) -> SemanticResult<BuiltinClasses> {
        let require = |kind: BuiltinKind| {
            self.builtin(kind).ok_or_else(|| {
                SemanticError::new(
                    SemanticErrorKind::MissingBuiltin,
                    format!("class {} is required", kind.name()),
                )
            })
        };
        Ok(BuiltinClasses {
            object: require(BuiltinKind::Object)?,
            boolean: require(BuiltinKind::Boolean)?,
            integer: require(BuiltinKind::Integer)?,
            float: require(BuiltinKind::Float)?,
            string: require(BuiltinKind::String)?,
        })
    }

    /// Store a method and attach it to its owner's declared table
    pub fn add_method(&mut self, mut method: MethodInfo) -> MethodId {
        let id = MethodId::from_index(self.methods.len());
        method.id = id;
        let owner = method.owner;
        let key = method.key.clone();
        self.methods.push(method);
        self.classes[owner.index()].methods.insert(key, id);
        id
    }

    pub fn method(&self, id: MethodId) -> &MethodInfo {
        &self.methods[id.index()]
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    /// `candidate` may be used where `required` is expected
    pub fn isa(&self, candidate: ClassId, required: ClassId) -> bool {
        self.classes[required.index()].subtypes.contains(&candidate)
    }

    /// The class followed by its ancestors up to the root
    pub fn ancestors(&self, id: ClassId) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: Some(id),
            remaining: self.classes.len(),
        }
    }

    /// Static lookup walking the declared tables upward
    pub fn find_method(&self, class: ClassId, key: &MethodKey) -> Option<MethodId> {
        self.ancestors(class)
            .find_map(|ancestor| self.class(ancestor).methods.get(key).copied())
    }

    pub fn find_field(&self, class: ClassId, name: &str) -> Option<&FieldInfo> {
        self.ancestors(class)
            .find_map(|ancestor| self.class(ancestor).fields.get(name))
    }

    /// Effective table lookup for a concrete class
    pub fn dispatch(&self, class: ClassId, key: &MethodKey) -> Option<MethodId> {
        self.classes[class.index()].dispatch.get(key).copied()
    }

    /// Fields an instance of `class` carries, root class first
    pub fn instance_fields(&self, class: ClassId) -> Vec<&FieldInfo> {
        let mut chain: Vec<ClassId> = self.ancestors(class).collect();
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|ancestor| self.class(ancestor).fields.values())
            .collect()
    }
}

/// Iterator over a class and its ancestors.
///
/// Bounded by the class count so an unresolved cycle cannot hang a caller.
pub struct Ancestors<'a> {
    registry: &'a ClassRegistry,
    next: Option<ClassId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.registry.class(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_map::FileId;

    fn loc() -> SourceLocation {
        SourceLocation::new(FileId::new(0), 0, 0)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ClassRegistry::new();
        let object = registry.register("Object", loc()).unwrap();
        let point = registry.register("Point", loc()).unwrap();
        assert_eq!(registry.lookup("Point").unwrap(), point);
        assert_eq!(registry.class(object).builtin, Some(BuiltinKind::Object));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_class_is_rejected() {
        let mut registry = ClassRegistry::new();
        registry.register("Point", loc()).unwrap();
        let error = registry.register("Point", loc()).unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::DuplicateClass);
        assert_eq!(error.message, "duplicate definition of class Point");
    }

    #[test]
    fn test_undefined_class() {
        let registry = ClassRegistry::new();
        let error = registry.lookup("Missing").unwrap_err();
        assert_eq!(error.kind, SemanticErrorKind::UndefinedClass);
        assert_eq!(error.message, "class Missing has not yet been defined");
    }

    #[test]
    fn test_missing_builtin_is_reported() {
        let mut registry = ClassRegistry::new();
        registry.register("Object", loc()).unwrap();
        registry.register("Boolean", loc()).unwrap();
        let error = registry.builtins().unwrap_err();
        assert_eq!(error.message, "class Integer is required");
    }

    #[test]
    fn test_ancestors_follow_parents() {
        let mut registry = ClassRegistry::new();
        let a = registry.register("A", loc()).unwrap();
        let b = registry.register("B", loc()).unwrap();
        let c = registry.register("C", loc()).unwrap();
        registry.class_mut(b).parent = Some(a);
        registry.class_mut(c).parent = Some(b);
        assert_eq!(registry.ancestors(c).collect::<Vec<_>>(), vec![c, b, a]);
    }
}
