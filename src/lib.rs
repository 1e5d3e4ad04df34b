pub mod cli;
pub mod config;
pub mod context;
pub mod convert;
pub mod deliver;
pub mod error;
pub mod fetch;
pub mod lambda;
pub mod pipeline;
pub mod report;
pub mod scratch;
pub mod sniff;
pub mod stamp;
pub mod util;
