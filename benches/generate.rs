use criterion::{Criterion, black_box, criterion_group, criterion_main};
use grammar_hive::{GrammarConfig, compile};

const EXPR: &str = r#"
{
<start>
<expr>;
}
{
<expr>
<term>;
<term> + <expr>;
}
{
<term>
<factor>;
<factor> * <term>;
}
{
<factor>
<number>;
( <expr> );
}
{
<number>
0;
1;
42;
}
"#;

fn bench_generate(c: &mut Criterion) {
    let grammar = compile(EXPR).unwrap().with_config(GrammarConfig {
        seed: Some(7),
        ..GrammarConfig::default()
    });

    c.bench_function("run", |b| b.iter(|| black_box(grammar.run())));
    c.bench_function("generate_multiple_256", |b| {
        b.iter(|| black_box(grammar.generate_multiple(256)))
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
