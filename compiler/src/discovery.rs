//! Class discovery: the first pass, registering every declared class name

use crate::error::SemanticResult;
use crate::ids::ClassId;
use crate::registry::ClassRegistry;
use log::info;
use parser::{ClassDecl, MinoFile};

/// A registered class paired with its declaration
#[derive(Debug, Clone, Copy)]
pub struct DeclaredClass<'a> {
    pub id: ClassId,
    pub decl: &'a ClassDecl,
}

/// Register the classes of every file, in file then declaration order
pub fn discover_classes<'a>(
    registry: &mut ClassRegistry,
    files: &'a [MinoFile],
) -> SemanticResult<Vec<DeclaredClass<'a>>> {
    let mut declared = Vec::new();
    for file in files {
        for decl in &file.classes {
            let id = registry.register(&decl.name.name, decl.name.span.at(decl.file_id))?;
            declared.push(DeclaredClass { id, decl });
        }
    }
    info!("discovered {} classes in {} files", declared.len(), files.len());
    Ok(declared)
}
