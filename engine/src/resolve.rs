//! Resolve API (§4.2, §2 10% share): priority-based retry loop over the
//! resolver pool. This is the only layer that knows about retry caps,
//! backoff, and SERVFAIL budgets — `ResolverClient::resolve` itself just
//! makes one attempt.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::DnsError;
use crate::model::{AnswerRecord, Priority, RecordKind};
use crate::resolver::ResolverPool;
use crate::util;

struct RetryPolicy {
    max_attempts: Option<u32>,
    max_wall_clock: Option<Duration>,
    servfail_giveup_threshold: Option<(u32, Duration)>,
    servfail_sleep_ceiling: u32,
}

fn policy_for(priority: Priority) -> RetryPolicy {
    match priority {
        Priority::Critical => RetryPolicy {
            max_attempts: None,
            max_wall_clock: None,
            servfail_giveup_threshold: None,
            servfail_sleep_ceiling: u32::MAX,
        },
        Priority::High => RetryPolicy {
            max_attempts: Some(50),
            max_wall_clock: Some(Duration::from_secs(120)),
            servfail_giveup_threshold: Some((10, Duration::from_secs(60))),
            servfail_sleep_ceiling: 5,
        },
        Priority::Low => RetryPolicy {
            max_attempts: Some(25),
            max_wall_clock: Some(Duration::from_secs(120)),
            servfail_giveup_threshold: Some((6, Duration::from_secs(60))),
            servfail_sleep_ceiling: 5,
        },
    }
}

/// `Resolve(name, type, priority)` (§4.2): pick a resolver, attempt once;
/// stop retrying as soon as the result is non-retryable (success or a
/// terminal RCODE), otherwise keep retrying per the priority's policy.
pub async fn resolve(
    pool: &ResolverPool,
    name: &str,
    kind: RecordKind,
    priority: Priority,
) -> Result<Vec<AnswerRecord>, DnsError> {
    let policy = policy_for(priority);
    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut servfail_count: u32 = 0;
    let mut last_err = DnsError::transport("no attempts made");

    loop {
        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(last_err);
            }
        }
        if let Some(max_wall) = policy.max_wall_clock {
            if started.elapsed() >= max_wall {
                return Err(last_err);
            }
        }
        if let Some((threshold, after)) = policy.servfail_giveup_threshold {
            if servfail_count > threshold && started.elapsed() >= after {
                return Err(last_err);
            }
        }

        attempts += 1;
        let client = pool.next_resolver().await?;
        match client.resolve(name, kind).await {
            Ok(answers) => return Ok(answers),
            Err(err) => {
                if err.rcode == crate::error::Rcode::SERVFAIL {
                    servfail_count += 1;
                }
                if !err.retryable() {
                    return Err(err);
                }
                last_err = err;
            }
        }

        if servfail_count <= policy.servfail_sleep_ceiling {
            let jitter_ms = rand::thread_rng().gen_range(3_000..=5_000);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }
    }
}

/// `Reverse(addr)` (§4.2): synthesize the PTR name, resolve at `Low`
/// priority, and return the first PTR answer with its trailing dot already
/// stripped by [`crate::model::normalize_data`]. Rejects addresses whose
/// synthesized name already looks like an arpa suffix, to block recursive
/// PTR-of-PTR loops.
pub async fn reverse(pool: &ResolverPool, addr: std::net::IpAddr) -> Result<String, DnsError> {
    let name = util::ptr_name(addr);
    if util::looks_like_arpa(&name) {
        return Err(DnsError::new(
            crate::error::Rcode::FORMERR,
            format!("refusing to reverse-resolve arpa-like name: {name}"),
        ));
    }

    let answers = resolve(pool, &name, RecordKind::Ptr, Priority::Low).await?;
    answers
        .into_iter()
        .next()
        .map(|a| a.data)
        .ok_or_else(|| DnsError::new(crate::error::Rcode::NXDOMAIN, format!("no PTR answer for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_and_high_priority_policies_have_documented_caps() {
        let low = policy_for(Priority::Low);
        assert_eq!(low.max_attempts, Some(25));
        let high = policy_for(Priority::High);
        assert_eq!(high.max_attempts, Some(50));
        let critical = policy_for(Priority::Critical);
        assert_eq!(critical.max_attempts, None);
    }

    #[tokio::test]
    async fn reverse_synthesizes_ptr_name_before_any_network_io() {
        let pool = ResolverPool::new(&[]).await.unwrap();
        let addr: std::net::IpAddr = "1.2.3.4".parse().unwrap();
        // `next_resolver` would fail first on an empty pool; since
        // `reverse`'s loop guard runs before any resolver is selected, this
        // exercises the synthesized-name path without needing live DNS.
        assert_eq!(util::ptr_name(addr), "4.3.2.1.in-addr.arpa");
        let err = reverse(&pool, addr).await.unwrap_err();
        assert_eq!(err.rcode, crate::error::Rcode::TRANSPORT);
    }
}
