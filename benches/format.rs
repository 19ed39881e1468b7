use criterion::{Criterion, criterion_group, criterion_main};
use sql_expand::{Arg, format};

fn format_statements() {
    let tests: [(&str, Vec<Arg>); 5] = [
        (
            "SELECT * FROM `users` WHERE `id`=%d AND `name`=%#s",
            vec![Arg::from(42), Arg::from("O'Brien")],
        ),
        (
            "UPDATE `t` SET `when`=%#T, `flag`=%B, `price`=%.2f WHERE `id`=%lu",
            vec![Arg::Timestamp(1_709_208_000), Arg::from(true), Arg::from(19.999), Arg::from(7u64)],
        ),
        (
            "INSERT INTO `log` VALUES (%#s, %#s, %#s, %c)",
            vec![Arg::from("a\nb"), Arg::null(), Arg::from("x\\y"), Arg::from('z')],
        ),
        ("SELECT %-10s|%10s|%.3s", vec![Arg::from("left"), Arg::from("right"), Arg::from("truncate")]),
        (
            "SELECT %e, %g, %a, %x, %#o",
            vec![Arg::from(12345.678), Arg::from(0.0001234), Arg::from(1.0), Arg::from(255), Arg::from(8)],
        ),
    ];
    for (fmt, mut args) in tests {
        _ = std::hint::black_box(format(fmt, &mut args));
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("format statements", |b| b.iter(|| format_statements()));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
