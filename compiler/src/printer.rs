//! Text and JSON dumps of the class tables

use crate::ids::ClassId;
use crate::registry::ClassRegistry;
use serde::Serialize;
use std::fmt::Write;

/// One class as reported by `mino check --format json`
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<FieldReport>,
    pub subtypes: Vec<String>,
    pub vtable: Vec<VtableEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VtableEntry {
    pub slot: usize,
    pub owner: String,
    pub method: String,
}

fn sorted_subtypes(registry: &ClassRegistry, class: ClassId) -> Vec<ClassId> {
    let mut subtypes: Vec<ClassId> = registry.class(class).subtypes.iter().copied().collect();
    subtypes.sort();
    subtypes
}

fn vtable(registry: &ClassRegistry, class: ClassId) -> Vec<VtableEntry> {
    registry
        .class(class)
        .dispatch
        .iter()
        .enumerate()
        .map(|(index, (key, &method))| VtableEntry {
            slot: index + 1,
            owner: registry.class_name(registry.method(method).owner).to_string(),
            method: key.to_string(),
        })
        .collect()
}

pub fn format_dispatch_tables(registry: &ClassRegistry) -> String {
    let mut out = String::new();
    for class in registry.classes() {
        let _ = writeln!(
            out,
            "============== Virtual Table for {} ==============",
            class.name
        );
        for entry in vtable(registry, class.id) {
            let _ = writeln!(out, "{} - {}.{}", entry.slot, entry.owner, entry.method);
        }
    }
    out
}

pub fn format_subtype_tables(registry: &ClassRegistry) -> String {
    let mut out = String::new();
    for class in registry.classes() {
        let _ = writeln!(
            out,
            "============== SubTypes Table for {} ==============",
            class.name
        );
        for (index, subtype) in sorted_subtypes(registry, class.id).into_iter().enumerate() {
            let _ = writeln!(out, "{} - {}", index + 1, registry.class_name(subtype));
        }
    }
    out
}

pub fn class_reports(registry: &ClassRegistry) -> Vec<ClassReport> {
    registry
        .classes()
        .map(|class| ClassReport {
            name: class.name.clone(),
            parent: class
                .parent
                .map(|parent| registry.class_name(parent).to_string()),
            fields: class
                .fields
                .values()
                .map(|field| FieldReport {
                    name: field.name.clone(),
                    ty: registry.class_name(field.ty).to_string(),
                })
                .collect(),
            subtypes: sorted_subtypes(registry, class.id)
                .into_iter()
                .map(|id| registry.class_name(id).to_string())
                .collect(),
            vtable: vtable(registry, class.id),
        })
        .collect()
}

pub fn reports_to_json(registry: &ClassRegistry) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&class_reports(registry))
}
