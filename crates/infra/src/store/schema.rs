//! Relational schema, applied idempotently at startup.

pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        date        TIMESTAMPTZ NOT NULL,
        place       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        image_url   TEXT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendees (
        id         UUID PRIMARY KEY,
        event_id   UUID NOT NULL REFERENCES events (id) ON DELETE CASCADE,
        name       TEXT NOT NULL,
        email      TEXT NULL,
        phone      TEXT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS experiences (
        id          UUID PRIMARY KEY,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS event_ratings (
        id         UUID PRIMARY KEY,
        event_id   UUID NOT NULL REFERENCES events (id) ON DELETE CASCADE,
        rating     SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS experience_ratings (
        id            UUID PRIMARY KEY,
        experience_id UUID NOT NULL REFERENCES experiences (id) ON DELETE CASCADE,
        rating        SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS attendees_event_id_idx ON attendees (event_id)",
    "CREATE INDEX IF NOT EXISTS event_ratings_event_id_idx ON event_ratings (event_id)",
    "CREATE INDEX IF NOT EXISTS experience_ratings_experience_id_idx ON experience_ratings (experience_id)",
    "CREATE INDEX IF NOT EXISTS events_created_at_idx ON events (created_at)",
    "CREATE INDEX IF NOT EXISTS attendees_created_at_idx ON attendees (created_at)",
    "CREATE INDEX IF NOT EXISTS experiences_created_at_idx ON experiences (created_at)",
];
