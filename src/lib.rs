pub mod config;
pub mod enrich;
pub mod fetch;
pub mod format;
pub mod ingest;
pub mod model;
pub mod output;
pub mod parser;
pub mod registry;
pub mod server;
pub mod stats;
pub mod store;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
