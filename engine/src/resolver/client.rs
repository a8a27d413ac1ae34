//! Per-resolver client (§4.1 Resolver Pool, "Per-client operations").
//!
//! Each client owns one UDP socket connected to a single upstream resolver.
//! A background reader loop dispatches incoming datagrams to parked callers
//! by transaction ID; a timeout reaper sweeps entries older than the
//! resolution window; a throttle monitor recomputes the adaptive
//! `successRate` every second. `resolve()` itself only sends and parks —
//! all the bookkeeping lives in those background tasks.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::watch;

use crate::error::DnsError;
use crate::model::{AnswerRecord, RecordKind};
use crate::wire;

/// Resolution window: write deadline, per-transaction timeout, and TCP
/// connect/write/read deadline all share this value (§4.1, §5).
pub const WINDOW: Duration = Duration::from_secs(2);

/// Idle backoff schedule the writer side would use if it were queue-driven;
/// kept as the documented shape even though `resolve()` here sends directly
/// rather than draining an internal queue, since callers (the pool) already
/// provide the backpressure this schedule exists to express.
pub const IDLE_BACKOFF_MS: &[u64] = &[10, 25, 50, 75, 100, 150, 250, 500];

struct Pending {
    sent_at: Instant,
    respond_to: tokio::sync::oneshot::Sender<Result<wire::ParsedReply, DnsError>>,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicU64,
    timeouts: AtomicU64,
    tick_successes: AtomicU64,
}

/// A single UDP/TCP DNS client bound to one upstream resolver address.
pub struct ResolverClient {
    pub addr: SocketAddr,
    socket: UdpSocket,
    pending: StdMutex<HashMap<u16, Pending>>,
    counters: Counters,
    success_rate: StdMutex<Duration>,
    last_send: StdMutex<Instant>,
    shutdown_tx: watch::Sender<bool>,
}

impl ResolverClient {
    /// Dial `addr` and spawn the reader loop, timeout reaper, and throttle
    /// monitor background tasks.
    pub async fn connect(addr: SocketAddr) -> Result<Arc<Self>, DnsError> {
        let bind_addr: SocketAddr = if addr.is_ipv4() { "0.0.0.0:0".parse().unwrap() } else { "[::]:0".parse().unwrap() };
        let socket = UdpSocket::bind(bind_addr).await.map_err(DnsError::from)?;
        socket.connect(addr).await.map_err(DnsError::from)?;

        let (shutdown_tx, _) = watch::channel(false);

        let client = Arc::new(ResolverClient {
            addr,
            socket,
            pending: StdMutex::new(HashMap::new()),
            counters: Counters::default(),
            success_rate: StdMutex::new(Duration::from_millis(0)),
            last_send: StdMutex::new(Instant::now() - WINDOW),
            shutdown_tx,
        });

        client.clone().spawn_reader();
        client.clone().spawn_timeout_reaper();
        client.clone().spawn_throttle_monitor();

        Ok(client)
    }

    /// Trip the shutdown signal; background tasks observe it and exit on
    /// their next wakeup.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn spawn_reader(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    res = self.socket.recv(&mut buf) => {
                        match res {
                            Ok(n) => self.dispatch(&buf[..n]),
                            Err(_) => continue,
                        }
                    }
                }
            }
        });
    }

    fn spawn_timeout_reaper(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(WINDOW);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => self.reap_timeouts(),
                }
            }
        });
    }

    fn spawn_throttle_monitor(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => self.recompute_success_rate(),
                }
            }
        });
    }

    fn reap_timeouts(&self) {
        let now = Instant::now();
        let mut expired = Vec::new();
        {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            pending.retain(|id, entry| {
                if now.duration_since(entry.sent_at) >= WINDOW {
                    expired.push(*id);
                    false
                } else {
                    true
                }
            });
        }
        // Each removed entry's `respond_to` sender drops here, which wakes its
        // caller with a closed-channel error (classified transport/retryable
        // in `round_trip`) — the "returned to its caller with a retryable
        // error" half of §4.1's timeout reaper.
        for id in expired {
            self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
            log::debug!("resolver {}: reaping timed-out transaction {id}", self.addr);
        }
    }

    fn recompute_success_rate(&self) {
        let successes = self.counters.tick_successes.swap(0, Ordering::Relaxed).max(1);
        let rate = (Duration::from_secs(1) / successes as u32).min(Duration::from_millis(100));
        *self.success_rate.lock().expect("success_rate mutex poisoned") = rate;
    }

    fn dispatch(&self, bytes: &[u8]) {
        let parsed = match wire::decode(bytes) {
            Ok(p) => p,
            Err(_) => return,
        };
        let entry = {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            pending.remove(&parsed.id)
        };
        if let Some(entry) = entry {
            if parsed.rcode.counts_as_success() {
                self.counters.tick_successes.fetch_add(1, Ordering::Relaxed);
            }
            let _ = entry.respond_to.send(Ok(parsed));
        }
    }

    fn alloc_txn_id(&self) -> Option<u16> {
        let pending = self.pending.lock().expect("pending mutex poisoned");
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let id: u16 = rng.gen();
            if !pending.contains_key(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Is this client available for selection right now (§4.1 Adaptive
    /// throttle)? Also available with 5% probability even when the
    /// schedule says otherwise, so calibration keeps moving under load.
    pub fn available(&self) -> bool {
        let last = *self.last_send.lock().expect("last_send mutex poisoned");
        let rate = *self.success_rate.lock().expect("success_rate mutex poisoned");
        Instant::now() > last + rate || rand::thread_rng().gen_bool(0.05)
    }

    /// Send `name`/`kind` and await the reply (or a timeout), falling back
    /// to a one-shot TCP retry on a truncated UDP reply (§4.1 Truncation
    /// fallback). Returns the normalized answers on a NOERROR rcode, or a
    /// `DnsError` carrying the RCODE otherwise (callers use
    /// `DnsError::retryable` to decide on retry).
    pub async fn resolve(&self, name: &str, kind: RecordKind) -> Result<Vec<AnswerRecord>, DnsError> {
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        let parsed = self.send_udp(name, kind).await?;

        let parsed = if parsed.truncated {
            self.send_tcp(name, kind).await?
        } else {
            parsed
        };

        if parsed.rcode == crate::error::Rcode::NOERROR {
            Ok(parsed.answers)
        } else {
            Err(DnsError::new(parsed.rcode, format!("{} for {name} {kind}", parsed.rcode)))
        }
    }

    async fn send_udp(&self, name: &str, kind: RecordKind) -> Result<wire::ParsedReply, DnsError> {
        let id = self.alloc_txn_id().ok_or_else(|| DnsError::transport("transaction id space exhausted"))?;
        let message = wire::build_query(id, name, kind)?;
        let bytes = wire::encode(&message)?;
        self.round_trip(id, &bytes).await
    }

    /// Send an already-built, already-id-tagged query and await its reply.
    /// Used directly by the NSEC walker (§4.7), which needs the authority
    /// section a higher-level `resolve()` call doesn't expose.
    pub async fn round_trip(&self, id: u16, bytes: &[u8]) -> Result<wire::ParsedReply, DnsError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            pending.insert(id, Pending { sent_at: Instant::now(), respond_to: tx });
        }
        *self.last_send.lock().expect("last_send mutex poisoned") = Instant::now();

        if let Err(err) = tokio::time::timeout(WINDOW, self.socket.send(bytes)).await {
            self.pending.lock().expect("pending mutex poisoned").remove(&id);
            return Err(DnsError::transport(err.to_string()));
        }

        match tokio::time::timeout(WINDOW, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DnsError::transport("resolver channel closed before reply")),
            Err(_) => {
                self.pending.lock().expect("pending mutex poisoned").remove(&id);
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                Err(DnsError::transport("timed out waiting for reply"))
            }
        }
    }

    async fn send_tcp(&self, name: &str, kind: RecordKind) -> Result<wire::ParsedReply, DnsError> {
        let id = rand::thread_rng().gen();
        let message = wire::build_query(id, name, kind)?;
        let bytes = wire::encode(&message)?;

        let mut stream = tokio::time::timeout(WINDOW, TcpStream::connect(self.addr))
            .await
            .map_err(|e| DnsError::transport(e.to_string()))?
            .map_err(DnsError::from)?;

        let len = (bytes.len() as u16).to_be_bytes();
        tokio::time::timeout(WINDOW, async {
            stream.write_all(&len).await?;
            stream.write_all(&bytes).await?;
            Ok::<_, io::Error>(())
        })
        .await
        .map_err(|e| DnsError::transport(e.to_string()))?
        .map_err(DnsError::from)?;

        let reply = tokio::time::timeout(WINDOW, async {
            let mut len_buf = [0u8; 2];
            stream.read_exact(&mut len_buf).await?;
            let len = u16::from_be_bytes(len_buf) as usize;
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).await?;
            Ok::<_, io::Error>(body)
        })
        .await
        .map_err(|e| DnsError::transport(e.to_string()))?
        .map_err(DnsError::from)?;

        wire::decode(&reply)
    }

    pub fn timeout_count(&self) -> u64 {
        self.counters.timeouts.load(Ordering::Relaxed)
    }

    pub fn attempt_count(&self) -> u64 {
        self.counters.attempts.load(Ordering::Relaxed)
    }
}
