pub mod engine;
pub mod gates;
pub mod normalize;
pub mod parlay;
pub mod probability;
pub mod report;
pub mod schedule;
pub mod scorer;
pub mod selection;
pub mod verify;

pub use engine::BotEngine;
