//! Dispatch table construction
//!
//! Each class starts from a copy of its parent's effective table and then
//! inserts its own declarations. An override replaces the inherited entry in
//! place, so a method keeps its slot position down the hierarchy.

use crate::ids::ClassId;
use crate::registry::ClassRegistry;
use log::{debug, info};

/// `order` must list ancestors before descendants
pub fn build_dispatch_tables(registry: &mut ClassRegistry, order: &[ClassId]) {
    for &class in order {
        let mut table = match registry.class(class).parent {
            Some(parent) => registry.class(parent).dispatch.clone(),
            None => Default::default(),
        };
        for (key, &method) in &registry.class(class).methods {
            if let Some(previous) = table.insert(key.clone(), method) {
                debug!(
                    "{}.{} overrides {}.{}",
                    registry.class_name(class),
                    key,
                    registry.class_name(registry.method(previous).owner),
                    key
                );
            }
        }
        registry.class_mut(class).dispatch = table;
    }
    info!("built dispatch tables for {} classes", order.len());
}
