//! Car slot lookup
//!
//! Resolves a car slot number to the RSF car id configured in `Cars.ini`.
//! Slot `n` lives in section `Car0<n>`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::storage::{file_store, FileStoreError};

/// Key holding the car id inside a slot section
pub const CAR_ID_KEY: &str = "RSFCarID";

/// Errors resolving a car slot
#[derive(Error, Debug)]
pub enum CarLookupError {
    #[error("Cars.ini file not found at path: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Car slot ID {0} not found in Cars.ini")]
    SlotNotFound(i64),

    #[error("RSFCarID not found for slot ID {0}")]
    CarIdMissing(i64),

    #[error("RSFCarID '{value}' for slot ID {slot} is not a number")]
    InvalidCarId { slot: i64, value: String },

    #[error(transparent)]
    File(#[from] FileStoreError),
}

impl CarLookupError {
    /// Whether this is a lookup miss (reported to devices as an error
    /// message) rather than an I/O failure
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            CarLookupError::SlotNotFound(_)
                | CarLookupError::CarIdMissing(_)
                | CarLookupError::InvalidCarId { .. }
        )
    }
}

/// Section name for a car slot
pub fn slot_section(slot_id: i64) -> String {
    format!("Car0{}", slot_id)
}

/// Look up the RSF car id for a slot
pub fn lookup_car_id(cars_ini: &Path, slot_id: i64) -> Result<i64, CarLookupError> {
    let config = file_store::read_blocking(cars_ini).map_err(|e| {
        if e.is_not_found() {
            CarLookupError::MissingFile(cars_ini.to_path_buf())
        } else {
            CarLookupError::File(e)
        }
    })?;

    let section = config
        .section(&slot_section(slot_id))
        .ok_or(CarLookupError::SlotNotFound(slot_id))?;

    let value = section
        .get(CAR_ID_KEY)
        .filter(|v| !v.is_empty())
        .ok_or(CarLookupError::CarIdMissing(slot_id))?;

    parse_leading_int(value).ok_or_else(|| CarLookupError::InvalidCarId {
        slot: slot_id,
        value: value.clone(),
    })
}

/// Parse the leading integer of a string, ignoring trailing garbage
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let digits_start = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    trimmed[..digits_start + digits_len].parse().ok()
}
