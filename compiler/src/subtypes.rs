//! Supertype resolution and subtype sets
//!
//! Resolves each class's declared parent (the root class when none is
//! given), rejects cycles and value-class parents, and then walks classes in inheritance order adding
//! each one to the subtype set of every ancestor. After this pass
//! `registry.isa(a, b)` is the reflexive transitive subclass relation.

use crate::discovery::DeclaredClass;
use crate::error::{SemanticError, SemanticErrorKind, SemanticResult};
use crate::ids::ClassId;
use crate::registry::{BuiltinClasses, ClassRegistry};
use fxhash::FxHashSet;
use log::{debug, info};

/// Returns every class ordered so that ancestors come before descendants
pub fn compute_subtypes(
    registry: &mut ClassRegistry,
    classes: &[DeclaredClass<'_>],
    builtins: &BuiltinClasses,
) -> SemanticResult<Vec<ClassId>> {
    resolve_parents(registry, classes, builtins)?;
    check_cycles(registry, classes)?;

    for class in classes {
        let depth = registry.ancestors(class.id).count() - 1;
        registry.class_mut(class.id).depth = depth;
    }

    let mut order: Vec<ClassId> = classes.iter().map(|c| c.id).collect();
    order.sort_by_key(|id| (registry.class(*id).depth, *id));

    for &class in &order {
        let ancestors: Vec<ClassId> = registry.ancestors(class).skip(1).collect();
        for ancestor in ancestors {
            registry.class_mut(ancestor).subtypes.insert(class);
        }
    }

    for &class in &order {
        let info = registry.class(class);
        debug!("{} has {} subtypes", info.name, info.subtypes.len());
    }
    info!("computed subtype sets for {} classes", order.len());
    Ok(order)
}

fn resolve_parents(
    registry: &mut ClassRegistry,
    classes: &[DeclaredClass<'_>],
    builtins: &BuiltinClasses,
) -> SemanticResult<()> {
    for class in classes {
        let parent = match &class.decl.special {
            Some(special) => {
                let location = special.span.at(class.decl.file_id);
                let parent = registry.lookup(&special.name).map_err(|e| e.at(location))?;
                // Value classes only get instances from literals
                if registry.class(parent).is_value_class() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::ValueClassParent,
                        format!(
                            "class {} cannot specialize built-in class {}",
                            class.decl.name.name, special.name
                        ),
                    )
                    .at(location));
                }
                Some(parent)
            }
            None if class.id == builtins.object => None,
            None => Some(builtins.object),
        };
        registry.class_mut(class.id).parent = parent;
    }
    Ok(())
}

fn check_cycles(registry: &ClassRegistry, classes: &[DeclaredClass<'_>]) -> SemanticResult<()> {
    let mut acyclic: FxHashSet<ClassId> = FxHashSet::default();
    for class in classes {
        let mut path = FxHashSet::default();
        let mut current = Some(class.id);
        while let Some(id) = current {
            if acyclic.contains(&id) {
                break;
            }
            if !path.insert(id) {
                return Err(SemanticError::new(
                    SemanticErrorKind::CyclicInheritance,
                    format!("cyclic inheritance involving {}", registry.class_name(id)),
                )
                .at(registry.class(id).location));
            }
            current = registry.class(id).parent;
        }
        acyclic.extend(path);
    }
    Ok(())
}
