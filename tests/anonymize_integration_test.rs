//! Integration tests for anonymizing tables of one group

mod common;

use common::{customers, MemoryDatabase, MemoryFactory, MemoryTable, Op, RecordingSink};
use masquerade::config::ForeignKeyPolicy;
use masquerade::core::orchestrator::{run_group, RunContext, RunOptions};
use masquerade::core::transform::TransformOptions;
use masquerade::domain::{ColumnSpec, FormatterSpec, GroupSpec, Modifiers, TableSpec, Value};
use masquerade::generator::ProviderCatalog;
use std::collections::HashSet;
use std::sync::Arc;

fn options(batch_size: usize, foreign_keys: ForeignKeyPolicy) -> RunOptions {
    RunOptions {
        transform: TransformOptions {
            batch_size,
            foreign_keys,
        },
        seed: Some(42),
        ..RunOptions::default()
    }
}

fn context(db: &Arc<MemoryDatabase>, options: RunOptions) -> RunContext {
    RunContext::new(MemoryFactory::new(Arc::clone(db)), ProviderCatalog::builtin(), options)
}

fn unique_email() -> ColumnSpec {
    ColumnSpec::new("email")
        .with_formatter(FormatterSpec::call("safeEmail", vec![]))
        .with_modifiers(Modifiers {
            unique: true,
            ..Modifiers::none()
        })
        .null_before_run()
}

fn group(table: TableSpec) -> GroupSpec {
    let mut group = GroupSpec::new("customer");
    group.upsert_table(table);
    group
}

#[tokio::test]
async fn test_unique_emails_and_untouched_columns() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(250));
    let before = db.table("customers");

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(unique_email());
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert!(summary.is_successful(), "{:?}", summary.error);
    assert_eq!(summary.rows_updated(), 250);

    let emails = db.column("customers", "email");
    assert_eq!(emails.len(), 250);
    assert!(emails.iter().all(|e| !e.is_null()));
    let distinct: HashSet<String> = emails.iter().map(|e| e.to_string()).collect();
    assert_eq!(distinct.len(), 250);

    let after = db.table("customers");
    for (key, row) in &before.rows {
        for column in ["firstname", "lastname", "nickname"] {
            assert_eq!(after.rows[key][column], row[column], "{column} of row {key}");
        }
    }
}

#[tokio::test]
async fn test_rows_are_visited_once_in_key_order() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(250));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(unique_email());
    let sink = RecordingSink::new();
    run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    let ops = db.ops_on("customers");

    // The null step runs once, before the first batch
    assert_eq!(
        ops[0],
        Op::UpdateAll {
            table: "customers".to_string(),
            columns: vec!["email".to_string()],
        }
    );
    assert_eq!(
        ops.iter().filter(|op| matches!(op, Op::UpdateAll { .. })).count(),
        1
    );

    let fetches: Vec<Option<i64>> = ops
        .iter()
        .filter_map(|op| match op {
            Op::FetchKeys { after, .. } => Some(*after),
            _ => None,
        })
        .collect();
    assert_eq!(fetches, vec![None, Some(100), Some(200)]);

    let updated: Vec<i64> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Update { key, .. } => Some(*key),
            _ => None,
        })
        .collect();
    assert_eq!(updated, (1..=250).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_exact_multiple_of_batch_size_reads_to_the_end() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(200));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![])));
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert_eq!(summary.tables[0].rows_visited, 200);
    let fetches = db
        .ops_on("customers")
        .into_iter()
        .filter(|op| matches!(op, Op::FetchKeys { .. }))
        .count();
    // The last page is empty
    assert_eq!(fetches, 3);
}

#[tokio::test]
async fn test_unknown_formatter_is_omitted_and_others_update() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(30));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("nickname").with_formatter(FormatterSpec::call("noSuchFormatter", vec![])))
        .with_column(ColumnSpec::new("lastname").with_formatter(FormatterSpec::call("lastName", vec![])));
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(10, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert!(summary.is_successful());
    assert_eq!(summary.tables[0].omitted_columns, vec!["nickname".to_string()]);
    assert_eq!(summary.tables[0].rows_updated, 30);

    for op in db.ops_on("customers") {
        if let Op::Update { columns, .. } = op {
            assert_eq!(columns, vec!["lastname".to_string()]);
        }
    }
    assert_eq!(db.column("customers", "nickname")[0], Value::from("nick1"));

    // Warned once, not once per row
    let warnings: Vec<_> = sink
        .warnings()
        .into_iter()
        .filter(|w| w.contains("nickname"))
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn test_missing_column_is_never_updated() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(20));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("middlename").with_formatter(FormatterSpec::call("firstName", vec![])).null_before_run())
        .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![])));
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert_eq!(summary.tables[0].missing_columns, vec!["middlename".to_string()]);
    for op in db.ops_on("customers") {
        match op {
            Op::Update { columns, .. } | Op::UpdateAll { columns, .. } => {
                assert!(!columns.contains(&"middlename".to_string()));
            }
            Op::FetchKeys { .. } | Op::ForeignKeys(_) => {}
        }
    }
    assert!(sink.warnings().iter().any(|w| w.contains("middlename")));
}

#[tokio::test]
async fn test_missing_table_is_skipped() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(5));

    let mut group = GroupSpec::new("customer");
    group.upsert_table(
        TableSpec::new("customer_grid_flat")
            .with_column(ColumnSpec::new("email").with_formatter(FormatterSpec::call("safeEmail", vec![]))),
    );
    group.upsert_table(
        TableSpec::new("customers")
            .with_primary_key("id")
            .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![]))),
    );

    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group,
        sink.as_ref(),
    )
    .await;

    assert!(summary.is_successful());
    assert_eq!(summary.tables_skipped(), 1);
    assert_eq!(summary.tables_processed(), 1);
    assert!(db.ops_on("customer_grid_flat").is_empty());
    assert_eq!(summary.rows_updated(), 5);
}

#[tokio::test]
async fn test_fixed_literal_is_written_to_every_row() {
    let db = MemoryDatabase::new();
    db.add_table(
        "customers",
        customers(12),
    );

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("nickname").with_formatter(FormatterSpec::Fixed(Value::Int(0))));
    let sink = RecordingSink::new();
    run_group(
        &context(&db, options(5, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert!(db.column("customers", "nickname").iter().all(|v| *v == Value::Int(0)));
}

#[tokio::test]
async fn test_rows_without_assignments_issue_no_statement() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(8));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("nickname"))
        .with_column(ColumnSpec::new("lastname").with_formatter(FormatterSpec::call("noSuchFormatter", vec![])));
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert_eq!(summary.tables[0].rows_visited, 8);
    assert_eq!(summary.tables[0].rows_updated, 0);
    assert!(!db
        .ops_on("customers")
        .iter()
        .any(|op| matches!(op, Op::Update { .. })));
}

/// Runs `column` over 40 customers and checks it is omitted without touching a row
async fn assert_column_omitted(column: ColumnSpec) {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(40));
    let name = column.name.clone();
    let before = db.column("customers", &name);

    let spec = TableSpec::new("customers").with_primary_key("id").with_column(column);
    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(10, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    assert!(summary.is_successful(), "{:?}", summary.error);
    assert_eq!(summary.tables[0].omitted_columns, vec![name.clone()]);
    assert_eq!(summary.tables[0].rows_updated, 0);
    assert!(!db
        .ops_on("customers")
        .iter()
        .any(|op| matches!(op, Op::Update { .. } | Op::UpdateAll { .. })));
    assert_eq!(db.column("customers", &name), before);
}

fn modified(column: ColumnSpec, unique: bool, optional: bool, valid: bool) -> ColumnSpec {
    column.with_modifiers(Modifiers {
        unique,
        optional,
        valid,
    })
}

#[tokio::test]
async fn test_bad_arguments_are_omitted_under_every_modifier() {
    for (unique, optional, valid) in [
        (false, true, false),
        (false, false, true),
        (false, true, true),
        (true, true, true),
    ] {
        let column = ColumnSpec::new("nickname").with_formatter(FormatterSpec::call(
            "numberBetween",
            vec![Value::from("low"), Value::Int(3)],
        ));
        assert_column_omitted(modified(column, unique, optional, valid)).await;
    }
}

#[tokio::test]
async fn test_unknown_formatter_is_omitted_under_every_modifier() {
    for (unique, optional, valid) in [(false, true, false), (false, false, true), (true, true, true)] {
        let column = ColumnSpec::new("nickname")
            .with_formatter(FormatterSpec::call("noSuchFormatter", vec![]));
        assert_column_omitted(modified(column, unique, optional, valid)).await;
    }
}

#[tokio::test]
async fn test_non_finite_bounds_are_omitted() {
    let latitude = ColumnSpec::new("nickname")
        .with_formatter(FormatterSpec::call("latitude", vec![Value::Float(f64::NAN)]));
    assert_column_omitted(latitude).await;

    let price = ColumnSpec::new("nickname").with_formatter(FormatterSpec::call(
        "randomFloat",
        vec![Value::Int(2), Value::Int(0), Value::Float(f64::INFINITY)],
    ));
    assert_column_omitted(modified(price, false, true, false)).await;
}

#[tokio::test]
async fn test_primary_key_is_never_rewritten() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(4));

    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(ColumnSpec::new("id").with_formatter(FormatterSpec::call("randomNumber", vec![])))
        .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![])));
    let sink = RecordingSink::new();
    run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    let keys: Vec<i64> = db.table("customers").rows.keys().copied().collect();
    assert_eq!(keys, vec![1, 2, 3, 4]);
    assert_eq!(
        db.column("customers", "id"),
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );
}

#[tokio::test]
async fn test_foreign_key_policies() {
    let cases = [
        (ForeignKeyPolicy::Enforced, vec![]),
        (ForeignKeyPolicy::DisabledForConnection, vec![false, true]),
        (ForeignKeyPolicy::DisabledDuringNullStep, vec![false, true]),
    ];

    for (policy, expected) in cases {
        let db = MemoryDatabase::new();
        db.add_table("customers", customers(3));
        let spec = TableSpec::new("customers")
            .with_primary_key("id")
            .with_column(unique_email());
        let sink = RecordingSink::new();
        run_group(&context(&db, options(100, policy)), &group(spec), sink.as_ref()).await;

        let toggles: Vec<bool> = db
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::ForeignKeys(enabled) => Some(enabled),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, expected, "{policy}");
    }
}

#[tokio::test]
async fn test_null_step_is_wrapped_by_foreign_key_toggle() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(3));
    let spec = TableSpec::new("customers")
        .with_primary_key("id")
        .with_column(unique_email());
    let sink = RecordingSink::new();
    run_group(
        &context(&db, options(100, ForeignKeyPolicy::DisabledDuringNullStep)),
        &group(spec),
        sink.as_ref(),
    )
    .await;

    let ops = db.ops();
    assert_eq!(ops[0], Op::ForeignKeys(false));
    assert!(matches!(ops[1], Op::UpdateAll { .. }));
    assert_eq!(ops[2], Op::ForeignKeys(true));
}

#[tokio::test]
async fn test_unknown_provider_fails_the_group() {
    let db = MemoryDatabase::new();
    db.add_table("customers", customers(3));
    db.add_table("notes", MemoryTable::new("id", &["body"]).with_row(1, &[("body", Value::from("x"))]));

    let mut group = GroupSpec::new("customer");
    group.upsert_table(
        TableSpec::new("customers")
            .with_primary_key("id")
            .with_column(
                ColumnSpec::new("firstname")
                    .with_provider("nope")
                    .with_formatter(FormatterSpec::call("firstName", vec![])),
            ),
    );
    group.upsert_table(
        TableSpec::new("notes")
            .with_primary_key("id")
            .with_column(ColumnSpec::new("body").with_formatter(FormatterSpec::call("sentence", vec![]))),
    );

    let sink = RecordingSink::new();
    let summary = run_group(
        &context(&db, options(100, ForeignKeyPolicy::Enforced)),
        &group,
        sink.as_ref(),
    )
    .await;

    let error = summary.error.expect("group should fail");
    assert!(error.contains("nope"), "{error}");
    // Tables after the failing one are not touched
    assert!(db.ops_on("notes").is_empty());
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let db = MemoryDatabase::new();
        db.add_table("customers", customers(10));
        let spec = TableSpec::new("customers")
            .with_primary_key("id")
            .with_column(ColumnSpec::new("firstname").with_formatter(FormatterSpec::call("firstName", vec![])));
        let sink = RecordingSink::new();
        run_group(
            &context(&db, options(100, ForeignKeyPolicy::Enforced)),
            &group(spec),
            sink.as_ref(),
        )
        .await;
        outputs.push(db.column("customers", "firstname"));
    }
    assert_eq!(outputs[0], outputs[1]);
}
