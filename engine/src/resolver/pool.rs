//! Resolver pool: owns the set of [`ResolverClient`]s and the selection
//! policy used to pick one for each `resolve()` call (§4.1 "Selection
//! policy").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;

use super::client::ResolverClient;
use crate::error::DnsError;

pub struct ResolverPool {
    clients: RwLock<Vec<Arc<ResolverClient>>>,
}

impl ResolverPool {
    /// Dial every address in `addrs`, replacing any previous pool (§4.1:
    /// `SetCustomResolvers` "cleanly stops existing clients and replaces
    /// the pool").
    pub async fn new(addrs: &[String]) -> Result<Self, DnsError> {
        let pool = ResolverPool { clients: RwLock::new(Vec::new()) };
        pool.set_resolvers(addrs).await?;
        Ok(pool)
    }

    pub async fn set_resolvers(&self, addrs: &[String]) -> Result<(), DnsError> {
        let mut dialed = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let socket_addr: SocketAddr = addr.parse().map_err(|_| DnsError::transport(format!("invalid resolver address: {addr}")))?;
            dialed.push(ResolverClient::connect(socket_addr).await?);
        }

        let mut clients = self.clients.write().await;
        for old in clients.drain(..) {
            old.stop();
        }
        *clients = dialed;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn stop_all(&self) {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            client.stop();
        }
    }

    /// §4.1 `nextResolver()`: random pick, resample up to `|pool|` times on
    /// unavailability, then a linear scan, then a short sleep-and-retry.
    pub async fn next_resolver(&self) -> Result<Arc<ResolverClient>, DnsError> {
        loop {
            let clients = self.clients.read().await;
            if clients.is_empty() {
                return Err(DnsError::transport("resolver pool is empty"));
            }

            let mut rng = rand::thread_rng();
            for _ in 0..clients.len() {
                let pick = &clients[rng.gen_range(0..clients.len())];
                if pick.available() {
                    return Ok(pick.clone());
                }
            }

            if let Some(found) = clients.iter().find(|c| c.available()) {
                return Ok(found.clone());
            }

            drop(clients);
            let sleep_ms = rand::thread_rng().gen_range(100..=1000);
            tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_pool_reports_transport_error() {
        let pool = ResolverPool { clients: RwLock::new(Vec::new()) };
        let err = pool.next_resolver().await.unwrap_err();
        assert_eq!(err.rcode, crate::error::Rcode::TRANSPORT);
    }
}
