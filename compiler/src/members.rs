//! Member collection
//!
//! Fills each class's field and method tables from its declaration. Every
//! type named in a signature must already be registered, so this runs after
//! discovery and before the subtype pass.

use crate::class_info::{FieldInfo, MethodInfo, MethodKey, MethodKind, ParamInfo, Primitive};
use crate::discovery::DeclaredClass;
use crate::error::{SemanticError, SemanticErrorKind, SemanticResult};
use crate::ids::{ClassId, MethodId};
use crate::registry::ClassRegistry;
use fxhash::FxHashSet;
use log::{debug, info};
use parser::{FieldDecl, Ident, Member, MethodBody, MethodDecl};
use source_map::FileId;

pub fn collect_members(
    registry: &mut ClassRegistry,
    classes: &[DeclaredClass<'_>],
) -> SemanticResult<()> {
    for class in classes {
        let file = class.decl.file_id;
        for member in &class.decl.members {
            match member {
                Member::Field(field) => add_field(registry, class.id, file, field)?,
                Member::Method(method) => {
                    add_method(registry, class.id, file, method)?;
                }
            }
        }
    }
    info!(
        "collected members: {} methods across {} classes",
        registry.methods().count(),
        classes.len()
    );
    Ok(())
}

fn resolve_type(registry: &ClassRegistry, file: FileId, ty: &Ident) -> SemanticResult<ClassId> {
    registry
        .lookup(&ty.name)
        .map_err(|e| e.at(ty.span.at(file)))
}

fn add_field(
    registry: &mut ClassRegistry,
    owner: ClassId,
    file: FileId,
    field: &FieldDecl,
) -> SemanticResult<()> {
    let location = field.name.span.at(file);
    if registry.class(owner).fields.contains_key(&field.name.name) {
        return Err(SemanticError::new(
            SemanticErrorKind::DuplicateField,
            format!(
                "duplicate definition of field {} in class {}",
                field.name.name,
                registry.class_name(owner)
            ),
        )
        .at(location));
    }
    let ty = resolve_type(registry, file, &field.ty)?;
    registry.class_mut(owner).fields.insert(
        field.name.name.clone(),
        FieldInfo {
            name: field.name.name.clone(),
            ty,
            owner,
            location,
        },
    );
    Ok(())
}

fn add_method(
    registry: &mut ClassRegistry,
    owner: ClassId,
    file: FileId,
    method: &MethodDecl,
) -> SemanticResult<MethodId> {
    let key = MethodKey::from(&method.name);
    let location = method.name.span().at(file);
    let owner_name = registry.class_name(owner).to_string();

    if registry.class(owner).methods.contains_key(&key) {
        return Err(SemanticError::new(
            SemanticErrorKind::DuplicateMethod,
            format!("duplicate definition of method {} in class {}", key, owner_name),
        )
        .at(location));
    }

    let mut seen = FxHashSet::default();
    let mut params = Vec::with_capacity(method.params.len());
    for param in &method.params {
        let param_location = param.name.span.at(file);
        if !seen.insert(param.name.name.as_str()) {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateParameter,
                format!("duplicate parameter {}", param.name.name),
            )
            .at(param_location));
        }
        params.push(ParamInfo {
            name: param.name.name.clone(),
            ty: resolve_type(registry, file, &param.ty)?,
            location: param_location,
        });
    }

    if key.is_operator() && params.len() != 1 {
        return Err(SemanticError::new(
            SemanticErrorKind::InvalidOperatorArity,
            format!("operator {} expects exactly one parameter", key),
        )
        .at(location));
    }

    let return_type = match &method.return_type {
        Some(ty) => Some(resolve_type(registry, file, ty)?),
        None => None,
    };

    let kind = match &method.body {
        MethodBody::Block(stmts) => MethodKind::User(stmts.clone()),
        MethodBody::Primitive => {
            let primitive = registry
                .class(owner)
                .builtin
                .and_then(|builtin| Primitive::resolve(builtin, &key))
                .ok_or_else(|| {
                    SemanticError::new(
                        SemanticErrorKind::UnknownPrimitive,
                        format!("no native implementation for primitive {}.{}", owner_name, key),
                    )
                    .at(location)
                })?;
            if primitive.arity() != params.len() {
                return Err(SemanticError::new(
                    SemanticErrorKind::UnknownPrimitive,
                    format!(
                        "primitive {}.{} expects {} parameters",
                        owner_name,
                        key,
                        primitive.arity()
                    ),
                )
                .at(location));
            }
            MethodKind::Primitive(primitive)
        }
    };

    debug!("collected method {}.{} ({} params)", owner_name, key, params.len());
    Ok(registry.add_method(MethodInfo {
        id: MethodId::from_raw(0),
        key,
        owner,
        params,
        return_type,
        kind,
        location,
    }))
}
