//! Race statistics lookup
//!
//! Single read-only query against the plugin's race statistics database:
//! the fastest finished run for a stage and car.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// One result row, keyed by column name
pub type StageTimeRow = Map<String, Value>;

const FASTEST_STAGE_TIME_SQL: &str = r#"
    SELECT
        FRR.RaceDate,
        FRR.RaceDateTime,
        FRR.RallyName,
        M.MapID AS StageID,
        M.StageName,
        FRR.Split1Time,
        FRR.Split2Time,
        FRR.FinishTime AS FastestStageTime,
        M.Format AS StageFormat,
        M.Length AS StageLength,
        C.CarID,
        C.ModelName AS CarModel,
        C.FIACategory AS FIACat,
        (FRR.FalseStartPenaltyTime + FRR.CutPenaltyTime + FRR.OtherPenaltyTime) AS TotalPenaltyTime
    FROM F_RallyResult FRR
    JOIN D_Map M ON FRR.MapKey = M.MapKey
    JOIN D_Car C ON FRR.CarKey = C.CarKey
    WHERE FRR.FinishTime IS NOT NULL
        AND M.MapID = ?1
        AND C.CarID = ?2
    ORDER BY FRR.FinishTime ASC
    LIMIT 1
"#;

/// Errors querying the race statistics database
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to open race statistics database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Fastest recorded time for a stage and car
pub fn fastest_stage_time(
    db_path: &Path,
    stage_id: i64,
    car_id: i64,
) -> Result<Vec<StageTimeRow>, QueryError> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| QueryError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;

    query_fastest(&conn, stage_id, car_id)
}

/// Run the fastest-time query on an open connection
pub fn query_fastest(
    conn: &Connection,
    stage_id: i64,
    car_id: i64,
) -> Result<Vec<StageTimeRow>, QueryError> {
    let mut stmt = conn.prepare(FASTEST_STAGE_TIME_SQL)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let rows = stmt.query_map(params![stage_id, car_id], |row| {
        let mut record = Map::new();
        for (index, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(index)?));
        }
        Ok(record)
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(QueryError::from)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a race statistics database with two runs of stage 10 in car 371
    pub(crate) fn seed_race_stats(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE D_Map (MapKey INTEGER PRIMARY KEY, MapID INTEGER, StageName TEXT,
                                Format TEXT, Length REAL);
            CREATE TABLE D_Car (CarKey INTEGER PRIMARY KEY, CarID INTEGER, ModelName TEXT,
                                FIACategory TEXT);
            CREATE TABLE F_RallyResult (
                MapKey INTEGER, CarKey INTEGER, RaceDate TEXT, RaceDateTime TEXT,
                RallyName TEXT, Split1Time REAL, Split2Time REAL, FinishTime REAL,
                FalseStartPenaltyTime REAL, CutPenaltyTime REAL, OtherPenaltyTime REAL);

            INSERT INTO D_Map VALUES (1, 10, 'Harwood Forest', 'Gravel', 4.8);
            INSERT INTO D_Car VALUES (1, 371, 'Subaru Impreza', 'WRC');
            INSERT INTO F_RallyResult VALUES
                (1, 1, '2024-03-01', '2024-03-01 20:00', 'Evening', 60.5, 120.25, 190.75, 0, 10, 0),
                (1, 1, '2024-03-02', '2024-03-02 21:00', 'Night', 58.0, 115.5, 185.5, 0, 0, 5),
                (1, 1, '2024-03-03', '2024-03-03 22:00', 'DNF', 57.0, NULL, NULL, 0, 0, 0);
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_fastest_stage_time() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("raceStatDB.sqlite3");
        seed_race_stats(&db);

        let rows = fastest_stage_time(&db, 10, 371).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["FastestStageTime"], Value::from(185.5));
        assert_eq!(row["RallyName"], Value::from("Night"));
        assert_eq!(row["StageID"], Value::from(10));
        assert_eq!(row["CarModel"], Value::from("Subaru Impreza"));
        assert_eq!(row["TotalPenaltyTime"], Value::from(5.0));
    }

    #[test]
    fn test_no_matching_runs() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("raceStatDB.sqlite3");
        seed_race_stats(&db);

        assert!(fastest_stage_time(&db, 99, 371).unwrap().is_empty());
    }

    #[test]
    fn test_missing_database() {
        let dir = TempDir::new().unwrap();
        let err = fastest_stage_time(&dir.path().join("missing.sqlite3"), 10, 371).unwrap_err();

        assert!(matches!(err, QueryError::Open { .. }));
    }

    #[test]
    fn test_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let err = query_fastest(&conn, 10, 371).unwrap_err();

        assert!(matches!(err, QueryError::Database(_)));
    }
}
