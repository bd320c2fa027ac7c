//! SeaORM entity definitions for the gitrank database schema.

pub mod account;
pub mod daily_counters;
pub mod prelude;
pub mod repository;
