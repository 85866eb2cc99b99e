//! Database schema

/// Table creation statements, safe to run against an existing database
pub const CREATE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY,
        addr TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS humans (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS human_nodes (
        human_id INTEGER NOT NULL REFERENCES humans(id) ON DELETE CASCADE,
        node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        PRIMARY KEY (human_id, node_id)
    )",
    // a single radio cannot send two signals at the same instant
    "CREATE TABLE IF NOT EXISTS datapoints (
        id INTEGER PRIMARY KEY,
        time INTEGER NOT NULL,
        frequency INTEGER NOT NULL,
        signal INTEGER NOT NULL,
        longitude REAL NOT NULL DEFAULT 0,
        latitude REAL NOT NULL DEFAULT 0,
        node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        CONSTRAINT unique_dps UNIQUE (time, node_id, signal)
    )",
];
