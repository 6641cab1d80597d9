// src/lib.rs

use std::sync::Arc;

use services::{prices::PriceOracle, subgraph::SubgraphService};

#[derive(Clone)]
pub struct AppState {
    pub subgraph: SubgraphService,
    pub prices: Arc<dyn PriceOracle>,
}

pub mod services {
    pub mod aggregator;
    pub mod prices;
    pub mod subgraph;
}

pub mod models {
    pub mod line;
    pub mod portfolio;
    pub mod subgraph;
    pub mod token;
}

pub mod handlers {
    pub mod line;
    pub mod portfolio;
}

pub mod errors;
