//! SQL migrations compiled into the binary

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All migrations, in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_transaction_ledger",
        sql: include_str!("../../migrations/001_transaction_ledger.sql"),
    }]
}
