//! Domain layer: entities, value objects and the ports the application layer
//! talks to. Nothing in here knows about storage engines, tokens or email.

pub mod money;
pub mod ports;
pub mod pricing;
pub mod product;
pub mod record;
pub mod user;
