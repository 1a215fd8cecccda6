//! Subtype sets, dispatch tables and their printed forms

use compiler::printer::{format_dispatch_tables, format_subtype_tables, reports_to_json};
use compiler::{compile_mino_source, ClassId, MethodKey, Program};
use diagnostics::SourceMap;

fn compile(source: &str) -> Program {
    compiler::logging::init_test();
    let mut source_map = SourceMap::new();
    match compile_mino_source(&mut source_map, "tables.mino", source) {
        Ok(program) => program,
        Err(e) => panic!("program should check: {}", e),
    }
}

fn class(program: &Program, name: &str) -> ClassId {
    program.registry.get(name).expect("class is registered")
}

const HIERARCHY: &str = r#"
class Shape {
    fun area(): Integer { return 0; }
    fun name(): String { return "shape"; }
}
class Rect special Shape {
    fun area(): Integer { return 4; }
}
class Square special Rect {
    fun name(): String { return "square"; }
}
class Circle special Shape { }
"#;

#[test]
fn test_subtype_sets_are_transitive_and_reflexive() {
    let program = compile(HIERARCHY);
    let registry = &program.registry;
    let shape = class(&program, "Shape");
    let rect = class(&program, "Rect");
    let square = class(&program, "Square");
    let circle = class(&program, "Circle");

    assert!(registry.isa(square, shape));
    assert!(registry.isa(square, rect));
    assert!(registry.isa(circle, shape));
    assert!(!registry.isa(shape, rect));
    assert!(!registry.isa(circle, rect));
    assert!(registry.isa(square, program.builtins.object));

    let all: Vec<ClassId> = registry.classes().map(|c| c.id).collect();
    for &a in &all {
        assert!(registry.isa(a, a));
        for &b in &all {
            for &c in &all {
                if registry.isa(a, b) && registry.isa(b, c) {
                    assert!(registry.isa(a, c));
                }
            }
        }
    }
}

#[test]
fn test_forward_parent_references() {
    let program = compile(
        r#"
class Leaf special Branch { }
class Branch special Trunk { }
class Trunk { }
"#,
    );
    let registry = &program.registry;
    let leaf = class(&program, "Leaf");
    let trunk = class(&program, "Trunk");
    assert!(registry.isa(leaf, trunk));
    assert_eq!(registry.class(leaf).depth, 3);
    assert_eq!(registry.class(trunk).parent, Some(program.builtins.object));
}

#[test]
fn test_dispatch_selects_most_specific_override() {
    let program = compile(HIERARCHY);
    let registry = &program.registry;
    let owner_of = |class_name: &str, method: &str| {
        let id = registry
            .dispatch(class(&program, class_name), &MethodKey::named(method))
            .expect("method is dispatchable");
        registry.class_name(registry.method(id).owner).to_string()
    };

    assert_eq!(owner_of("Shape", "area"), "Shape");
    assert_eq!(owner_of("Rect", "area"), "Rect");
    assert_eq!(owner_of("Square", "area"), "Rect");
    assert_eq!(owner_of("Square", "name"), "Square");
    assert_eq!(owner_of("Circle", "name"), "Shape");
    assert_eq!(owner_of("Circle", "abort"), "Object");
}

#[test]
fn test_overrides_keep_their_slot() {
    let program = compile(HIERARCHY);
    let registry = &program.registry;
    let slots = |name: &str| -> Vec<String> {
        registry
            .class(class(&program, name))
            .dispatch
            .keys()
            .map(|k| k.to_string())
            .collect()
    };
    assert_eq!(slots("Shape"), slots("Square"));
    assert_eq!(slots("Shape"), ["abort", "=", "!=", "area", "name"]);
}

#[test]
fn test_virtual_table_dump() {
    let program = compile(HIERARCHY);
    let text = format_dispatch_tables(&program.registry);
    let expected = "\
============== Virtual Table for Square ==============
1 - Object.abort
2 - Object.=
3 - Object.!=
4 - Rect.area
5 - Square.name
";
    assert!(text.contains(expected), "unexpected dump:\n{}", text);
    assert!(text.starts_with("============== Virtual Table for Object ==============\n"));
}

#[test]
fn test_subtype_table_dump() {
    let program = compile(HIERARCHY);
    let text = format_subtype_tables(&program.registry);
    let expected = "\
============== SubTypes Table for Rect ==============
1 - Rect
2 - Square
";
    assert!(text.contains(expected), "unexpected dump:\n{}", text);
}

#[test]
fn test_json_report() {
    let program = compile("class Point { var _x: Integer; fun x(): Integer { return _x; } }");
    let json = reports_to_json(&program.registry).expect("report serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let point = value
        .as_array()
        .and_then(|classes| classes.iter().find(|c| c["name"] == "Point"))
        .expect("Point is reported");
    assert_eq!(point["parent"], "Object");
    assert_eq!(point["fields"][0]["type"], "Integer");
    assert_eq!(point["vtable"][3]["owner"], "Point");
    assert_eq!(point["vtable"][3]["slot"], 4);
}
