//! Port traits decoupling the pipeline from files and rendering.

pub mod config_port;
pub mod data_port;
pub mod report_port;
