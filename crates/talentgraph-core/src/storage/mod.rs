//! Storage layer: connection pool, schema migrations, and CV file/job stores

mod cv;
mod database;
pub mod migrations;

pub use cv::{CvFile, CvJob, CvStore, JobStatus, NewCvFile};
pub use database::Database;
