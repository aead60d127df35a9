use criterion::{black_box, criterion_group, criterion_main, Criterion};
use overrun::eval::{Scope, Value};
use overrun::render::{render, Mode};
use overrun::template::record_eval;

fn make_scope(n: usize) -> Scope {
    let files: Vec<Value> = (0..n).map(|i| Value::from(format!("dir {i}/file's name.txt"))).collect();
    Scope::new()
        .with("files", files)
        .with("dest", "/tmp/out dir")
        .with("flags", vec!["-a", "-v"])
}

const TEMPLATE: &str = r#"rsync {flags:l} --exclude "*.tmp" {files:l} {dest + "/"}"#;

fn bench_render(c: &mut Criterion) {
    let mut g = c.benchmark_group("record_render");

    for n in [1usize, 100, 1000] {
        let mut scope = make_scope(n);
        g.bench_function(format!("record_{n}"), |b| {
            b.iter(|| record_eval(black_box(TEMPLATE), &mut scope))
        });

        let rec = match record_eval(TEMPLATE, &mut scope) {
            Ok(r) => r,
            Err(e) => panic!("bench template failed: {e}"),
        };
        g.bench_function(format!("shell_{n}"), |b| b.iter(|| render(black_box(&rec), Mode::Shell)));
        g.bench_function(format!("vector_{n}"), |b| b.iter(|| render(black_box(&rec), Mode::Vector)));
    }

    g.finish();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
