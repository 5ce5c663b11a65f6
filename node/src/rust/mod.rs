// Node module - ModelServe inference node implementation

pub mod configuration;
pub mod runtime;
