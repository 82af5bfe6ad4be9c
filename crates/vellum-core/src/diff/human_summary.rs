//! Human-readable rendering of an entity's change history.

use crate::diff::model::{Changeset, ColumnChange};

/// Render changesets as a Markdown history, oldest transaction first.
///
/// Informational only; the structured [`Changeset`]s remain the contract.
pub fn render_history(entity_type: &str, entity_id: &str, changesets: &[Changeset]) -> String {
    let mut out = String::new();

    out.push_str(&format!("## History of {entity_type} `{entity_id}`\n\n"));

    if changesets.is_empty() {
        out.push_str("_No recorded versions._\n");
        return out;
    }

    for cs in changesets {
        let actor = cs
            .transaction
            .actor_id
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "system".to_string());
        out.push_str(&format!(
            "### Transaction {} ({}) by {}: {}\n\n",
            cs.transaction.id,
            cs.transaction.issued_at.to_rfc3339(),
            actor,
            cs.operation
        ));

        if cs.changes.is_empty() {
            if cs.is_delete() {
                out.push_str("_Entity deleted._\n\n");
            } else {
                out.push_str("_No column changes._\n\n");
            }
            continue;
        }

        out.push_str("| Column | Old | New |\n|---|---|---|\n");
        for (column, change) in &cs.changes {
            let ColumnChange { old, new } = change;
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                column,
                cell(old.as_ref()),
                cell(new.as_ref())
            ));
        }
        out.push('\n');
    }

    out
}

fn cell(value: Option<&crate::model::ColumnValue>) -> String {
    value
        .map(|v| v.to_string().replace('|', "\\|"))
        .unwrap_or_else(|| "_null_".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, ColumnValue, OperationKind, Transaction, TransactionId};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn changeset(id: i64, op: OperationKind, changes: BTreeMap<String, ColumnChange>) -> Changeset {
        Changeset {
            transaction: Transaction {
                id: TransactionId::new(id),
                issued_at: Utc::now(),
                actor_id: Some(ActorId::new("curator@example.org")),
            },
            operation: op,
            changes,
        }
    }

    #[test]
    fn test_render_lists_columns_and_actor() {
        let changes = BTreeMap::from([(
            "title".to_string(),
            ColumnChange {
                old: None,
                new: Some(ColumnValue::from("Bob")),
            },
        )]);
        let text = render_history("reference", "R1", &[changeset(1, OperationKind::Insert, changes)]);

        assert!(text.contains("## History of reference `R1`"));
        assert!(text.contains("curator@example.org"));
        assert!(text.contains("| title | _null_ | \"Bob\" |"));
    }

    #[test]
    fn test_render_marks_delete() {
        let text = render_history(
            "reference",
            "R1",
            &[changeset(3, OperationKind::Delete, BTreeMap::new())],
        );
        assert!(text.contains("_Entity deleted._"));
    }

    #[test]
    fn test_render_empty_history() {
        assert!(render_history("reference", "R1", &[]).contains("_No recorded versions._"));
    }
}
