//! Class definition parsing tests for the Mino parser

use parser::{
    parse_mino_file, ExprKind, FileId, Member, MethodBody, MethodName, MinoFile, Operator, StmtKind,
};

fn parse(input: &str) -> MinoFile {
    match parse_mino_file(FileId::new(0), "test.mino", input) {
        Ok(file) => file,
        Err(e) => panic!("source should parse, got: {} at {}", e, e.offset),
    }
}

#[test]
fn test_empty_file() {
    let file = parse("");
    assert!(file.classes.is_empty());
    assert!(file.statements.is_empty());
    assert_eq!(file.span.start, 0);
    assert_eq!(file.span.end, 0);
}

#[test]
fn test_class_with_parent_and_members() {
    let file = parse(
        r#"
class Point special Object {
    var _x: Integer;
    var _y: Integer;

    fun x(): Integer { return _x; }
    fun move(dx: Integer, dy: Integer) {
        _x = _x + dx;
        _y = _y + dy;
    }
}
"#,
    );
    assert_eq!(file.classes.len(), 1);
    let class = &file.classes[0];
    assert_eq!(class.name.name, "Point");
    assert_eq!(class.special.as_ref().map(|p| p.name.as_str()), Some("Object"));
    assert_eq!(class.members.len(), 4);

    match &class.members[1] {
        Member::Field(field) => {
            assert_eq!(field.name.name, "_y");
            assert_eq!(field.ty.name, "Integer");
        }
        other => panic!("expected field, got {:?}", other),
    }
    match &class.members[3] {
        Member::Method(method) => {
            assert_eq!(method.name.to_string(), "move");
            assert_eq!(method.params.len(), 2);
            assert_eq!(method.params[1].name.name, "dy");
            assert!(method.return_type.is_none());
            match &method.body {
                MethodBody::Block(body) => {
                    assert_eq!(body.len(), 2);
                    assert!(matches!(body[0].kind, StmtKind::FieldAssign { .. }));
                }
                MethodBody::Primitive => panic!("fun members have a body"),
            }
        }
        other => panic!("expected method, got {:?}", other),
    }
}

#[test]
fn test_operator_and_primitive_members() {
    let file = parse(
        r#"
class Vec {
    var _n: Integer;
    fun +(other: Vec): Vec { return self; }
    fun <=(other: Vec): Boolean { return true; }
    primitive to_s(): String;
    primitive !=(other: Object): Boolean;
}
"#,
    );
    let names: Vec<String> = file.classes[0]
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Method(method) => Some(method.name.to_string()),
            Member::Field(_) => None,
        })
        .collect();
    assert_eq!(names, ["+", "<=", "to_s", "!="]);

    match &file.classes[0].members[2] {
        Member::Method(method) => {
            assert!(matches!(method.name, MethodName::Operator(Operator::Le, _)));
        }
        other => panic!("expected method, got {:?}", other),
    }
    match &file.classes[0].members[3] {
        Member::Method(method) => {
            assert_eq!(method.body, MethodBody::Primitive);
            assert_eq!(method.return_type.as_ref().map(|t| t.name.as_str()), Some("String"));
        }
        other => panic!("expected method, got {:?}", other),
    }
}

#[test]
fn test_classes_then_main_program() {
    let source = r#"
class A { }
class B special A { }
var b: A = new B;
if (b isa B) { b.to_s(); }
"#;
    let file = parse(source);
    assert_eq!(file.classes.len(), 2);
    assert_eq!(file.statements.len(), 2);
    match &file.statements[0].kind {
        StmtKind::VarDecl { name, ty, init: Some(init) } => {
            assert_eq!(name.name, "b");
            assert_eq!(ty.name, "A");
            assert!(matches!(init.kind, ExprKind::New(_)));
        }
        other => panic!("unexpected {:?}", other),
    }
    let class_b = &file.classes[1];
    assert_eq!(&source[class_b.span.start..class_b.span.end], "class B special A { }");
}

#[test]
fn test_missing_parent_name() {
    let err = parse_mino_file(FileId::new(0), "test.mino", "class A special { }").unwrap_err();
    assert_eq!(err.message, "expected parent class name after 'special'");
}

#[test]
fn test_primitive_with_body_is_rejected() {
    let err = parse_mino_file(
        FileId::new(0),
        "test.mino",
        "class A { primitive f() { return; } }",
    )
    .unwrap_err();
    assert_eq!(err.message, "expected ';' after primitive declaration");
}

#[test]
fn test_field_without_underscore() {
    let err = parse_mino_file(FileId::new(0), "test.mino", "class A { var x: Integer; }").unwrap_err();
    assert_eq!(err.message, "expected field name starting with '_'");
    assert_eq!(err.location(FileId::new(0)).start, 14);
}
