//! Per-socket connection bookkeeping: outbound channels and per-IP
//! connection limits. Grounded on the teacher's
//! `server::connection_manager::ConnectionManager`, trimmed of the
//! cross-instance coordinator and app-info bookkeeping this design has no
//! equivalent for.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::SocketId;
use crate::protocol::ServerMessage;

#[derive(Debug, thiserror::Error)]
pub enum RegisterClientError {
    #[error("too many connections from this address ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

#[derive(Clone)]
pub(crate) struct ClientConnection {
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub ip: IpAddr,
    pub last_activity: Instant,
}

pub struct ConnectionManager {
    clients: DashMap<SocketId, ClientConnection>,
    connections_per_ip: DashMap<IpAddr, usize>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            max_connections_per_ip,
        }
    }

    pub fn register(
        &self,
        socket_id: SocketId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        ip: IpAddr,
    ) -> Result<(), RegisterClientError> {
        self.try_reserve_ip_slot(ip)?;
        self.clients.insert(
            socket_id,
            ClientConnection {
                sender,
                ip,
                last_activity: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn sender_for(&self, socket_id: &SocketId) -> Option<mpsc::Sender<Arc<ServerMessage>>> {
        self.clients.get(socket_id).map(|c| c.sender.clone())
    }

    pub fn touch(&self, socket_id: &SocketId) {
        if let Some(mut client) = self.clients.get_mut(socket_id) {
            client.last_activity = Instant::now();
        }
    }

    pub fn has_client(&self, socket_id: &SocketId) -> bool {
        self.clients.contains_key(socket_id)
    }

    pub fn remove(&self, socket_id: &SocketId) -> Option<()> {
        self.clients.remove(socket_id).map(|(_, connection)| {
            self.release_ip_slot(connection.ip);
        })
    }

    pub fn collect_expired(&self, idle_timeout: std::time::Duration) -> Vec<SocketId> {
        let now = Instant::now();
        self.clients
            .iter()
            .filter_map(|entry| {
                if now.duration_since(entry.last_activity) > idle_timeout {
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect()
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, RegisterClientError> {
        match self.connections_per_ip.entry(ip) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(RegisterClientError::IpLimitExceeded {
                        current,
                        limit: self.max_connections_per_ip,
                    })
                } else {
                    let slot = entry.get_mut();
                    *slot += 1;
                    Ok(*slot)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(RegisterClientError::IpLimitExceeded { current: 0, limit: 0 })
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let dashmap::mapref::entry::Entry::Occupied(mut entry) = self.connections_per_ip.entry(ip) {
            if *entry.get() > 1 {
                *entry.get_mut() -= 1;
            } else {
                entry.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use uuid::Uuid;

    fn channel() -> (
        mpsc::Sender<Arc<ServerMessage>>,
        mpsc::Receiver<Arc<ServerMessage>>,
    ) {
        mpsc::channel(4)
    }

    fn addr(s: &str) -> IpAddr {
        s.parse::<SocketAddr>().unwrap().ip()
    }

    #[test]
    fn enforces_ip_limit_and_releases_on_remove() {
        let manager = ConnectionManager::new(1);
        let ip = addr("127.0.0.1:1");

        let (tx1, _rx1) = channel();
        let a = Uuid::new_v4();
        manager.register(a, tx1, ip).expect("first connection ok");

        let (tx2, _rx2) = channel();
        let b = Uuid::new_v4();
        let err = manager.register(b, tx2, ip).unwrap_err();
        assert!(matches!(err, RegisterClientError::IpLimitExceeded { current: 1, limit: 1 }));

        manager.remove(&a);

        let (tx3, _rx3) = channel();
        manager.register(b, tx3, ip).expect("slot freed after remove");
    }

    #[test]
    fn collect_expired_finds_idle_clients() {
        let manager = ConnectionManager::new(10);
        let ip = addr("127.0.0.1:2");
        let (tx, _rx) = channel();
        let socket_id = Uuid::new_v4();
        manager.register(socket_id, tx, ip).unwrap();

        assert!(manager.collect_expired(std::time::Duration::from_secs(0)).contains(&socket_id));
        assert!(manager
            .collect_expired(std::time::Duration::from_secs(3600))
            .is_empty());
    }

    #[test]
    fn zero_limit_rejects_everyone() {
        let manager = ConnectionManager::new(0);
        let ip = addr("127.0.0.1:3");
        let (tx, _rx) = channel();
        assert!(manager.register(Uuid::new_v4(), tx, ip).is_err());
    }
}
