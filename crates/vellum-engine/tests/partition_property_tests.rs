#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Random mutation sequences through the engine always leave a chain whose
//! intervals partition the transaction axis from the first insert onwards.

mod common;

use common::*;
use proptest::prelude::*;
use vellum_core::errors::ExErrorKind;
use vellum_core::model::{ColumnValue, Columns};
use vellum_core::timeline::covering_row;
use vellum_engine::{apply_engine_command, verify_chain, version_at, versions, EngineCommand};

#[derive(Debug, Clone)]
enum Action {
    Write(String, Option<i64>),
    Delete,
    Revert(usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (
            prop::sample::select(vec!["Bob", "new title", "Alice"]),
            prop::option::of(0i64..3)
        )
            .prop_map(|(t, p)| Action::Write(t.to_string(), p)),
        1 => Just(Action::Delete),
        1 => (0usize..8).prop_map(Action::Revert),
    ]
}

fn command(action: &Action, exists: bool, committed: &[i64]) -> Option<EngineCommand> {
    let entity_type = "reference".to_string();
    match action {
        Action::Write(title, pages) => {
            let values = Columns::new()
                .with("title", title.as_str())
                .with("page_count", *pages);
            Some(if exists {
                EngineCommand::Update {
                    entity_type,
                    entity_id: id("P1"),
                    changes: values,
                }
            } else {
                EngineCommand::Create {
                    entity_type,
                    columns: values.with("curie", "P1"),
                }
            })
        }
        Action::Delete if exists => Some(EngineCommand::Delete {
            entity_type,
            entity_id: id("P1"),
        }),
        Action::Revert(i) if exists && !committed.is_empty() => Some(EngineCommand::Revert {
            entity_type,
            entity_id: id("P1"),
            target: tx(committed[i % committed.len()]),
        }),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_engine_chain_partitions_transaction_axis(
        actions in prop::collection::vec(action_strategy(), 1..12)
    ) {
        let (mut conn, registry) = setup();
        let mut exists = false;
        let mut committed: Vec<i64> = Vec::new();

        for action in &actions {
            let Some(cmd) = command(action, exists, &committed) else { continue };
            match apply_engine_command(cmd, &mut conn, &registry, Some("prop")) {
                Ok(result) => {
                    exists = !result.row.is_delete();
                    committed.push(result.transaction.id.get());
                }
                // Reverting to a point where the entity was deleted has no state
                Err(e) => prop_assert_eq!(e.kind(), ExErrorKind::NoHistoricalState),
            }
        }
        prop_assume!(!committed.is_empty());

        let report = verify_chain(&conn, &registry, "reference", &id("P1")).unwrap();
        prop_assert!(report.is_healthy(), "{:?}", report.violations);

        let rows: Vec<_> = versions(&conn, &registry, "reference", &id("P1"))
            .unwrap()
            .into_iter()
            .map(|r| r.row)
            .collect();
        prop_assert_eq!(rows.len(), committed.len());

        let first = committed[0];
        let last = *committed.last().unwrap();
        for t in first..=last + 1 {
            let covering: Vec<_> = rows.iter().filter(|r| r.covers(tx(t))).collect();
            prop_assert_eq!(covering.len(), 1);
            let row = covering_row(&rows, tx(t)).unwrap();
            match version_at(&conn, &registry, "reference", &id("P1"), tx(t)) {
                Ok(found) => {
                    prop_assert!(!row.is_delete());
                    prop_assert_eq!(&found, row);
                    prop_assert_ne!(found.columns.get("title"), &ColumnValue::Null);
                }
                Err(e) => {
                    prop_assert!(row.is_delete());
                    prop_assert_eq!(e.kind(), ExErrorKind::NoHistoricalState);
                }
            }
        }
    }
}
