pub mod mocks;
pub mod traits;

pub use mocks::{MockBroker, MockMarketData};
pub use traits::{BrokerAdapter, FillConfirmation, MarketDataProvider};
