pub mod client;
pub mod markets;
pub mod provider;

pub use client::OddsApiClient;
pub use markets::markets_for_sport;
pub use provider::OddsSource;
