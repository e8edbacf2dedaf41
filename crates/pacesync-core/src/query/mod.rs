//! Stage time query service
//!
//! Resolves a stage and car slot to the fastest recorded run. The engine
//! only sees the [`StageTimesQuery`] trait and relays whatever reply it gets
//! back to the requesting device verbatim.
//!
//! Pipeline:
//! 1. `Cars.ini` slot section → RSF car id (`car_id`)
//! 2. read-only query against the race statistics database (`stage_times`)

pub mod car_id;
pub mod stage_times;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::layout::{cars_ini_path, race_stat_db_path};

pub use car_id::{lookup_car_id, CarLookupError};
pub use stage_times::{fastest_stage_time, QueryError, StageTimeRow};

/// A stage time request from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimesRequest {
    pub stage_id: i64,
    pub slot_id: i64,
}

/// Reply relayed to the device as the `data` field
///
/// Serializes as the row array, as `{ "error": ... }` for a lookup miss, or
/// as `null` when the files or the database could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageTimesReply {
    Rows(Vec<StageTimeRow>),
    Failure { error: String },
    Unavailable,
}

/// Callable query service consumed by the dispatcher
pub trait StageTimesQuery: Send + Sync {
    fn stage_times(&self, request: &StageTimesRequest, install_root: &Path) -> StageTimesReply;
}

/// Query service backed by the simulator's `Cars.ini` and race statistics database
#[derive(Debug, Clone, Copy, Default)]
pub struct RaceStatQuery;

impl StageTimesQuery for RaceStatQuery {
    fn stage_times(&self, request: &StageTimesRequest, install_root: &Path) -> StageTimesReply {
        let cars_ini = cars_ini_path(install_root);
        let car_id = match lookup_car_id(&cars_ini, request.slot_id) {
            Ok(id) => id,
            Err(e) if e.is_lookup_miss() => {
                return StageTimesReply::Failure {
                    error: e.to_string(),
                }
            }
            Err(e) => {
                warn!("Error reading car slot {}: {}", request.slot_id, e);
                return StageTimesReply::Unavailable;
            }
        };

        debug!(
            "Executing query for car {} on stage {}",
            car_id, request.stage_id
        );
        let db_path = race_stat_db_path(install_root);
        match fastest_stage_time(&db_path, request.stage_id, car_id) {
            Ok(rows) => StageTimesReply::Rows(rows),
            Err(e) => {
                warn!(
                    "Database error for stage {} car {}: {}",
                    request.stage_id, car_id, e
                );
                StageTimesReply::Unavailable
            }
        }
    }
}
