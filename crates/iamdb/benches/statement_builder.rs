use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use iamdb::{Change, Column, Condition, QueryOpts, StatementBuilder, UserRepository};

const COLUMNS: [&str; 8] = ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"];

fn bench_push_args(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/push_args");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let mut builder = StatementBuilder::new("SELECT * FROM t WHERE id IN (");
                builder.push_args(values.iter().copied());
                builder.push(")");
                black_box(builder.into_parts());
            });
        });
    }

    group.finish();
}

fn bench_repeated_args(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/repeated_args");

    // Every value repeats, so each append searches the existing arguments.
    for n in [10, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut builder = StatementBuilder::empty();
                for i in 0..n {
                    black_box(builder.append_arg(i64::from(i % 8)));
                }
                black_box(builder.into_parts());
            });
        });
    }

    group.finish();
}

fn bench_condition_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/condition_tree");

    for n in [1, 4, 8] {
        let condition = Condition::and(
            COLUMNS[..n]
                .iter()
                .map(|name| {
                    let column = Column::new("t", *name);
                    Condition::or(vec![
                        Condition::equal(&column, "a"),
                        Condition::starts_with_ignore_case(&column, "b"),
                    ])
                })
                .collect(),
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &condition, |b, condition| {
            b.iter(|| black_box(condition.to_sql()));
        });
    }

    group.finish();
}

fn bench_json_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/json_patch");
    let metadata = Column::new("users", "metadata");

    for n in [1, 5, 20] {
        let changes: Vec<Change> = (0..n)
            .map(|i| Change::json_set_field(&metadata, format!("key{i}"), &i))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &changes, |b, changes| {
            b.iter(|| {
                let mut builder = StatementBuilder::new("UPDATE users SET ");
                iamdb::stmt::write_changes(&mut builder, changes).unwrap();
                black_box(builder.into_parts());
            });
        });
    }

    group.finish();
}

fn bench_user_select(c: &mut Criterion) {
    let users = UserRepository::default();

    c.bench_function("statement_builder/user_select", |b| {
        b.iter(|| {
            let opts = QueryOpts::new()
                .condition(Condition::and(vec![
                    users.instance_id_condition("instance"),
                    users.login_name_condition("ada@acme"),
                ]))
                .order_by(&users.username_column())
                .limit(50);
            let mut builder = StatementBuilder::new("SELECT * FROM zitadel.users users");
            opts.write(&mut builder);
            black_box(builder.into_parts());
        });
    });
}

criterion_group!(
    benches,
    bench_push_args,
    bench_repeated_args,
    bench_condition_tree,
    bench_json_patch,
    bench_user_select
);
criterion_main!(benches);
