// Domain layer: records, rule table and ports. No I/O here.

pub mod institution;
pub mod model;
pub mod ports;
pub mod rules;
