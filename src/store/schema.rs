pub const SCHEMA: &str = r#"
-- Every resource kind shares one table; the body is the full JSON document
CREATE TABLE IF NOT EXISTS resources (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    uid TEXT NOT NULL,

    -- Optimistic concurrency token, bumped on every write
    resource_version INTEGER NOT NULL DEFAULT 1,

    body TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(kind, name)
);

-- Namespaces per cluster, '' is the host cluster
CREATE TABLE IF NOT EXISTS namespaces (
    cluster TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    labels TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (cluster, name)
);

CREATE INDEX IF NOT EXISTS idx_resources_kind ON resources(kind);
"#;
