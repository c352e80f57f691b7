// Domain model: form element trees, derived schemas and the builder store

pub mod builder;
pub mod element;
pub mod other_option;
pub mod schema;
pub mod values;
