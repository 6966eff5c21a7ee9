use std::sync::Arc;

use ethers::prelude::*;

/// Builds an HTTP JSON-RPC provider. The engine is single-chain (spec.md
/// §1/§9); generalized from the teacher's two near-identical
/// `create_ethereum_provider`/`create_base_provider` helpers into one.
pub fn create_http_provider(rpc_url: &str) -> Result<Arc<Provider<Http>>, Box<dyn std::error::Error>> {
    let provider = Provider::<Http>::try_from(rpc_url)?;
    Ok(Arc::new(provider))
}

/// Builds a WebSocket provider for the mempool pending-tx subscription
/// (§6 "Mempool stream").
pub async fn create_ws_provider(ws_url: &str) -> Result<Provider<Ws>, Box<dyn std::error::Error>> {
    let provider = Provider::<Ws>::connect(ws_url).await?;
    Ok(provider)
}
