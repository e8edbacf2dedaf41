//! Command handlers

pub mod car_id;
pub mod config;
pub mod serve;
pub mod stage_times;
