//! Benchmarks for dispatch-heavy and arithmetic-heavy programs

use compiler::compile_mino_source;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use diagnostics::SourceMap;
use runtime::Interpreter;
use std::io;

fn loop_program(iterations: usize) -> String {
    format!(
        r#"
var i: Integer = 0;
var total: Integer = 0;
while (i < {}) {{
    total = total + i * 2 % 7;
    i = i + 1;
}}
"#,
        iterations
    )
}

fn dispatch_program(iterations: usize) -> String {
    format!(
        r#"
class Shape {{ fun area(): Integer {{ return 0; }} }}
class Square special Shape {{ fun area(): Integer {{ return 4; }} }}
class Circle special Shape {{ fun area(): Integer {{ return 3; }} }}
var shapes: Shape = new Square;
var other: Shape = new Circle;
var i: Integer = 0;
var total: Integer = 0;
while (i < {}) {{
    total = total + shapes.area() + other.area();
    i = i + 1;
}}
"#,
        iterations
    )
}

fn bench_program(c: &mut Criterion, group_name: &str, generate: fn(usize) -> String) {
    let mut group = c.benchmark_group(group_name);

    for iterations in [100, 1_000, 10_000].iter() {
        let mut source_map = SourceMap::new();
        let code = generate(*iterations);
        let program = match compile_mino_source(&mut source_map, "bench.mino", &code) {
            Ok(program) => program,
            Err(e) => panic!("benchmark program should check: {}", e),
        };

        group.bench_with_input(BenchmarkId::from_parameter(iterations), &program, |b, program| {
            b.iter(|| {
                let mut interpreter = Interpreter::new(program, io::sink());
                black_box(interpreter.run().is_ok());
            });
        });
    }

    group.finish();
}

fn benchmark_arithmetic_loop(c: &mut Criterion) {
    bench_program(c, "arithmetic_loop", loop_program);
}

fn benchmark_virtual_dispatch(c: &mut Criterion) {
    bench_program(c, "virtual_dispatch", dispatch_program);
}

criterion_group!(benches, benchmark_arithmetic_loop, benchmark_virtual_dispatch);

criterion_main!(benches);
