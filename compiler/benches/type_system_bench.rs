//! Benchmarks for the front-end passes on generated class hierarchies

use compiler::compile_mino_source;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diagnostics::SourceMap;

fn generate_deep_inheritance(depth: usize) -> String {
    let mut code = String::new();

    // Each level overrides the previous level's method and adds its own
    for i in 0..depth {
        if i > 0 {
            code.push_str(&format!("class Level{} special Level{} {{\n", i, i - 1));
        } else {
            code.push_str("class Level0 {\n");
        }
        code.push_str(&format!("    fun method{}(): Integer {{ return {}; }}\n", i, i));
        code.push_str(&format!("    fun shared(): Integer {{ return {}; }}\n", i));
        code.push_str("}\n\n");
    }

    code.push_str(&format!("var obj: Level0 = new Level{};\n", depth - 1));
    code.push_str(&format!("var leaf: Level{} = new Level{};\n", depth - 1, depth - 1));
    for i in 0..depth {
        code.push_str(&format!("leaf.method{}();\n", i));
    }
    code.push_str("obj.shared();\n");
    code
}

fn generate_many_locals(count: usize) -> String {
    let mut code = String::new();
    code.push_str("class Locals {\n");
    for i in 0..count {
        code.push_str(&format!("    var _field{}: Integer;\n", i));
    }
    code.push_str("    fun run(): Integer {\n");
    for i in 0..count {
        code.push_str(&format!("        var local{}: Integer = _field{};\n", i, i));
    }
    code.push_str("        return local0;\n    }\n}\n");
    code
}

fn compile(code: &str) {
    let mut source_map = SourceMap::new();
    let result = compile_mino_source(&mut source_map, "bench.mino", black_box(code));
    black_box(result.is_ok());
}

fn benchmark_inheritance_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("inheritance_resolution");

    for depth in [10, 20, 50, 100].iter() {
        let code = generate_deep_inheritance(*depth);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &code, |b, code| {
            b.iter(|| compile(code));
        });
    }

    group.finish();
}

fn benchmark_scope_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("scope_resolution");

    for count in [100, 500, 1000].iter() {
        let code = generate_many_locals(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &code, |b, code| {
            b.iter(|| compile(code));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_inheritance_resolution,
    benchmark_scope_resolution
);

criterion_main!(benches);
