pub mod builders;
pub mod carrier;
pub mod delegate;
pub mod error;
pub mod factory;
pub mod telemetry;
pub mod unit;
pub mod visitor;
