//! Class, field and method metadata
//!
//! [`ClassInfo`] is created once per declared class by the registry and then
//! filled in by later passes: member collection adds fields and methods, the
//! subtype pass sets the parent and subtype set, and dispatch construction
//! fills the effective method table.

use crate::ids::{ClassId, MethodId};
use fxhash::FxHashSet;
use indexmap::IndexMap;
use parser::{MethodName, Operator, Stmt};
use source_map::{FileId, SourceLocation};
use std::fmt;

/// The classes with a native representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Object,
    Boolean,
    Integer,
    Float,
    String,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 5] = [
        BuiltinKind::Object,
        BuiltinKind::Boolean,
        BuiltinKind::Integer,
        BuiltinKind::Float,
        BuiltinKind::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Object => "Object",
            BuiltinKind::Boolean => "Boolean",
            BuiltinKind::Integer => "Integer",
            BuiltinKind::Float => "Float",
            BuiltinKind::String => "String",
        }
    }

    pub fn from_name(name: &str) -> Option<BuiltinKind> {
        BuiltinKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Classes whose instances only come from literals
    pub fn is_value(self) -> bool {
        !matches!(self, BuiltinKind::Object)
    }
}

/// Key of a method table entry: an identifier or an operator symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodKey {
    Named(String),
    Operator(Operator),
}

impl MethodKey {
    pub fn named(name: impl Into<String>) -> Self {
        MethodKey::Named(name.into())
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, MethodKey::Operator(_))
    }
}

impl From<&MethodName> for MethodKey {
    fn from(name: &MethodName) -> Self {
        match name {
            MethodName::Id(ident) => MethodKey::Named(ident.name.clone()),
            MethodName::Operator(op, _) => MethodKey::Operator(*op),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKey::Named(name) => f.write_str(name),
            MethodKey::Operator(op) => f.write_str(op.symbol()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: ClassId,
    pub owner: ClassId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: ClassId,
    pub location: SourceLocation,
}

/// Native operations bound to `primitive` members of built-in classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `Object.abort(message)`
    Abort,
    /// Reference comparison: `=`/`!=` on Object, Boolean and String
    Identity(Operator),
    /// Integer `+ - * / %`
    IntegerArith(Operator),
    /// Float `+ - * / %`
    FloatArith(Operator),
    /// Integer and Float `=`/`!=`, by value with widening
    NumericEquality(Operator),
    IntegerToS,
    FloatToS,
    StringConcat,
    /// String `< <= > >=`, lexicographic
    StringOrdering(Operator),
    /// `String.to_system_out()`
    StringPrint,
}

impl Primitive {
    /// The native operation for `key` on a built-in class, if there is one
    pub fn resolve(builtin: BuiltinKind, key: &MethodKey) -> Option<Primitive> {
        use BuiltinKind as B;
        match key {
            MethodKey::Named(name) => match (builtin, name.as_str()) {
                (B::Object, "abort") => Some(Primitive::Abort),
                (B::Integer, "to_s") => Some(Primitive::IntegerToS),
                (B::Float, "to_s") => Some(Primitive::FloatToS),
                (B::String, "to_system_out") => Some(Primitive::StringPrint),
                _ => None,
            },
            MethodKey::Operator(op) => {
                let op = *op;
                match builtin {
                    B::Object | B::Boolean if op.is_equality() => Some(Primitive::Identity(op)),
                    B::Integer | B::Float if op.is_equality() => {
                        Some(Primitive::NumericEquality(op))
                    }
                    B::Integer if op.is_arithmetic() => Some(Primitive::IntegerArith(op)),
                    B::Float if op.is_arithmetic() => Some(Primitive::FloatArith(op)),
                    B::String if op.is_equality() => Some(Primitive::Identity(op)),
                    B::String if op.is_ordering() => Some(Primitive::StringOrdering(op)),
                    B::String if op == Operator::Plus => Some(Primitive::StringConcat),
                    _ => None,
                }
            }
        }
    }

    /// Number of arguments the native implementation consumes
    pub fn arity(self) -> usize {
        match self {
            Primitive::IntegerToS | Primitive::FloatToS | Primitive::StringPrint => 0,
            _ => 1,
        }
    }
}

/// Executable part of a method
#[derive(Debug, Clone)]
pub enum MethodKind {
    User(Vec<Stmt>),
    Primitive(Primitive),
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: MethodId,
    pub key: MethodKey,
    pub owner: ClassId,
    pub params: Vec<ParamInfo>,
    /// `None` means the call yields the receiver's type
    pub return_type: Option<ClassId>,
    pub kind: MethodKind,
    pub location: SourceLocation,
}

impl MethodInfo {
    /// File the body's spans point into
    pub fn file(&self) -> FileId {
        self.location.file
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, MethodKind::Primitive(_))
    }
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    pub builtin: Option<BuiltinKind>,
    pub location: SourceLocation,
    /// Direct supertype; `None` only for the root class
    pub parent: Option<ClassId>,
    /// Distance from the root, set by the subtype pass
    pub depth: usize,
    pub fields: IndexMap<String, FieldInfo>,
    /// Methods declared by this class only
    pub methods: IndexMap<MethodKey, MethodId>,
    /// This class and every descendant
    pub subtypes: FxHashSet<ClassId>,
    /// Effective method table after override resolution
    pub dispatch: IndexMap<MethodKey, MethodId>,
}

impl ClassInfo {
    pub fn new(id: ClassId, name: impl Into<String>, location: SourceLocation) -> Self {
        let name = name.into();
        let mut subtypes = FxHashSet::default();
        subtypes.insert(id);
        Self {
            id,
            builtin: BuiltinKind::from_name(&name),
            name,
            location,
            parent: None,
            depth: 0,
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            subtypes,
            dispatch: IndexMap::new(),
        }
    }

    pub fn is_value_class(&self) -> bool {
        self.builtin.is_some_and(BuiltinKind::is_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes_are_recognised_by_name() {
        let location = SourceLocation::new(FileId::new(0), 0, 0);
        let integer = ClassInfo::new(ClassId::from_raw(0), "Integer", location);
        let object = ClassInfo::new(ClassId::from_raw(1), "Object", location);
        let point = ClassInfo::new(ClassId::from_raw(2), "Point", location);
        assert!(integer.is_value_class());
        assert!(!object.is_value_class());
        assert_eq!(point.builtin, None);
        assert!(point.subtypes.contains(&point.id));
    }

    #[test]
    fn test_primitive_catalogue() {
        let plus = MethodKey::Operator(Operator::Plus);
        assert_eq!(
            Primitive::resolve(BuiltinKind::Integer, &plus),
            Some(Primitive::IntegerArith(Operator::Plus))
        );
        assert_eq!(
            Primitive::resolve(BuiltinKind::String, &plus),
            Some(Primitive::StringConcat)
        );
        assert_eq!(Primitive::resolve(BuiltinKind::Boolean, &plus), None);
        assert_eq!(
            Primitive::resolve(BuiltinKind::Object, &MethodKey::named("abort")),
            Some(Primitive::Abort)
        );
        assert_eq!(
            Primitive::resolve(BuiltinKind::Integer, &MethodKey::named("abort")),
            None
        );
        assert_eq!(Primitive::StringPrint.arity(), 0);
        assert_eq!(Primitive::Abort.arity(), 1);
    }

    #[test]
    fn test_method_key_display() {
        assert_eq!(MethodKey::named("to_s").to_string(), "to_s");
        assert_eq!(MethodKey::Operator(Operator::Le).to_string(), "<=");
    }
}
