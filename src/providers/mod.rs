//! Quote provider implementations

pub mod binance;
pub mod coingecko;
pub mod failover;

pub use binance::BinanceProvider;
pub use coingecko::CoinGeckoProvider;
pub use failover::{select_outcome, FailoverProvider, FetchOutcome};

use crate::{constants::USER_AGENT, error::ProviderError};
use reqwest::Client;
use std::time::Duration;

/// HTTP client shared by the adapters; `timeout` bounds connect and the whole request
fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Address of a server that accepts connections but never answers
#[cfg(test)]
async fn unresponsive_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", addr)
}
