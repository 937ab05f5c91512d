pub mod cache;
pub mod catalog;
pub mod coerce;
pub mod errors;
pub mod graphql;
pub mod introspection;
pub mod naming;
pub mod operation;
pub mod schema;
pub mod selection;
pub mod server;
pub mod whitelist;
