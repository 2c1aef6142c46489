use anrex::{Compiler, Optimizer, OptimizerError, compile};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

struct EchoOptimizer;

impl Optimizer for EchoOptimizer {
    fn optimize(&self, alternation: &str) -> Result<String, OptimizerError> {
        Ok(alternation.to_string())
    }
}

fn bench_plain_copy(c: &mut Criterion) {
    let source = r"^[a-z]+@[a-z]+\\.[a-z]+$".repeat(20);

    c.bench_function("plain_copy", |b| {
        b.iter(|| black_box(compile(black_box(&source))))
    });
}

fn bench_annotated_source(c: &mut Criterion) {
    let source = concat!(
        "{?P<octet>25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?}   # one byte\n",
        r"${octet}\\.${octet}\\.${octet}\\.${octet}",
    );

    c.bench_function("annotated_source", |b| {
        b.iter(|| black_box(compile(black_box(source))))
    });
}

fn bench_variable_substitution(c: &mut Criterion) {
    let mut source = String::from("{?P<word>[a-z]+}");
    for _ in 0..50 {
        source.push_str("${word}");
    }

    c.bench_function("variable_substitution", |b| {
        b.iter(|| black_box(compile(black_box(&source))))
    });
}

fn bench_group_optimization(c: &mut Criterion) {
    let optimizer = EchoOptimizer;
    let compiler = Compiler::new().with_optimizer(&optimizer);
    let source = "(ab|ac)(de|df)(gh|gi)(jk|jl)";

    c.bench_function("group_optimization", |b| {
        b.iter(|| black_box(compiler.compile(black_box(source))))
    });
}

criterion_group!(
    benches,
    bench_plain_copy,
    bench_annotated_source,
    bench_variable_substitution,
    bench_group_optimization
);
criterion_main!(benches);
