// Domain layer: typed user records and the ports (traits) the pipeline talks through.

pub mod model;
pub mod ports;
