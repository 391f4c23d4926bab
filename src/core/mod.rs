pub mod catalog;
pub mod copy;
pub mod events;
pub mod ledger;
pub mod orchestrator;
pub mod scanner;
pub mod skip;
pub mod space;
