// Runtime module - boundary to the native server runtime

pub mod server_options;
