//! Car id command handler

use std::path::PathBuf;

use anyhow::{bail, Result};

use pacesync_core::query::lookup_car_id;

use crate::output::{Output, OutputFormat};

/// Look up the RSF car id configured for a car slot
pub fn lookup(cars_ini: PathBuf, slot: i64, output: &Output) -> Result<()> {
    match lookup_car_id(&cars_ini, slot) {
        Ok(car_id) => {
            match output.format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "CarId": car_id })),
                OutputFormat::Quiet => println!("{}", car_id),
                OutputFormat::Human => println!("Slot {} → car {}", slot, car_id),
            }
            Ok(())
        }
        Err(e) => {
            if output.is_json() {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            bail!(e)
        }
    }
}
