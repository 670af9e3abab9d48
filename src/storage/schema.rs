//! Database schema constants and SQL queries.

/// Upper bound on payload length, matching the `VARCHAR` column width.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// SQL schema for creating the events table.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id BIGINT PRIMARY KEY,
    payload VARCHAR(255) NOT NULL,
    stored_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Inserts one event. Fails on a duplicate primary key.
pub const INSERT_EVENT: &str = "INSERT INTO events (id, payload) VALUES ($1, $2)";

pub const SELECT_EVENT_PAYLOAD: &str = "SELECT payload FROM events WHERE id = $1";

pub const COUNT_EVENTS: &str = "SELECT COUNT(*) FROM events";

/// Returns all schema statements in order of execution.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_EVENTS_TABLE]
}
