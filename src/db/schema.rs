//! SQLite schema, applied idempotently at startup.

pub const CURRENT_SCHEMA: &str = r#"
PRAGMA foreign_keys = 1;

CREATE TABLE IF NOT EXISTS athletes (
    id INTEGER PRIMARY KEY,
    username TEXT,
    firstname TEXT,
    lastname TEXT,
    profile_medium TEXT,
    profile TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    sex TEXT,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY,
    athlete_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    distance REAL NOT NULL DEFAULT 0,
    moving_time INTEGER NOT NULL DEFAULT 0,
    elapsed_time INTEGER NOT NULL DEFAULT 0,
    total_elevation_gain REAL NOT NULL DEFAULT 0,
    type TEXT NOT NULL,
    sport_type TEXT,
    start_date TEXT NOT NULL,
    start_date_local TEXT NOT NULL,
    calculated_day TEXT NOT NULL,
    timezone TEXT,
    utc_offset INTEGER,
    achievement_count INTEGER,
    kudos_count INTEGER,
    comment_count INTEGER,
    athlete_count INTEGER,
    photo_count INTEGER,
    total_photo_count INTEGER,
    trainer BOOLEAN,
    commute BOOLEAN,
    manual BOOLEAN,
    private BOOLEAN,
    flagged BOOLEAN,
    average_speed REAL,
    max_speed REAL,
    average_cadence REAL,
    average_temp REAL,
    average_watts REAL,
    max_watts REAL,
    weighted_average_watts REAL,
    kilojoules REAL,
    device_watts BOOLEAN,
    has_heartrate BOOLEAN,
    average_heartrate REAL,
    max_heartrate REAL,
    elev_high REAL,
    elev_low REAL,
    upload_id INTEGER,
    upload_id_str TEXT,
    external_id TEXT,
    from_accepted_tag BOOLEAN,
    pr_count INTEGER,
    has_kudoed BOOLEAN,
    workout_type INTEGER,
    description TEXT,
    calories REAL,
    gear_id TEXT,
    summary_polyline TEXT,
    start_latlng TEXT,
    end_latlng TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (athlete_id) REFERENCES athletes (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_activities_athlete_day
    ON activities (athlete_id, calculated_day);

CREATE INDEX IF NOT EXISTS idx_activities_athlete_start
    ON activities (athlete_id, start_date);

CREATE TABLE IF NOT EXISTS streaks (
    athlete_id INTEGER PRIMARY KEY,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    total_days INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (athlete_id) REFERENCES athletes (id) ON DELETE CASCADE
);
"#;
