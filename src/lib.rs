// Library for tests to access modules

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod frame_repo;
pub mod gps_repo;
pub mod models;
pub mod routes;
pub mod sampler;
pub mod sysinfo_repo;
pub mod version;
pub mod watcher;
pub mod worker;
