//! Error taxonomy for the resolution pipeline (§7 ERROR HANDLING DESIGN).
//!
//! Every resolver-facing failure carries a numeric RCODE: a real DNS RCODE
//! when one was returned on the wire, or the synthesized value `100` when
//! the failure happened below the protocol (timeout, connect error, a
//! malformed reply). `Rcode::retryable()` is the single source of truth the
//! Resolve API (`crate::resolve`) consults for retry policy.

use std::fmt;

/// Synthesized RCODE for failures that never produced a parseable DNS reply.
pub const RCODE_TRANSPORT: u16 = 100;

/// A DNS response/failure code, either a real RCODE off the wire or the
/// synthesized transport value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rcode(pub u16);

impl Rcode {
    pub const NOERROR: Rcode = Rcode(0);
    pub const FORMERR: Rcode = Rcode(1);
    pub const SERVFAIL: Rcode = Rcode(2);
    pub const NXDOMAIN: Rcode = Rcode(3);
    pub const NOTIMP: Rcode = Rcode(4);
    pub const REFUSED: Rcode = Rcode(5);
    pub const YXDOMAIN: Rcode = Rcode(6);
    pub const NOTAUTH: Rcode = Rcode(9);
    pub const NOTZONE: Rcode = Rcode(10);
    pub const TRANSPORT: Rcode = Rcode(RCODE_TRANSPORT);

    /// Transient (retryable) per §4.1/§7: SERVFAIL, REFUSED, NOTIMPL, or a
    /// synthesized transport error. Everything else is terminal.
    pub fn retryable(self) -> bool {
        matches!(self, Rcode::SERVFAIL | Rcode::REFUSED | Rcode::NOTIMP | Rcode::TRANSPORT)
    }

    /// Counted towards the adaptive throttle's success tally (§4.1): any
    /// RCODE that means the resolver itself is healthy, even if the name
    /// doesn't exist.
    pub fn counts_as_success(self) -> bool {
        matches!(
            self,
            Rcode::NOERROR | Rcode::FORMERR | Rcode::NXDOMAIN | Rcode::YXDOMAIN | Rcode::NOTAUTH | Rcode::NOTZONE
        )
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Rcode::NOERROR => "NOERROR",
            Rcode::FORMERR => "FORMERR",
            Rcode::SERVFAIL => "SERVFAIL",
            Rcode::NXDOMAIN => "NXDOMAIN",
            Rcode::NOTIMP => "NOTIMP",
            Rcode::REFUSED => "REFUSED",
            Rcode::YXDOMAIN => "YXDOMAIN",
            Rcode::NOTAUTH => "NOTAUTH",
            Rcode::NOTZONE => "NOTZONE",
            Rcode::TRANSPORT => "TRANSPORT",
            Rcode(code) => return write!(f, "RCODE({code})"),
        };
        write!(f, "{name}")
    }
}

/// A resolver-layer failure: always carries the RCODE that drives retry
/// policy, plus a human-readable cause for logging.
#[derive(Debug)]
pub struct DnsError {
    pub rcode: Rcode,
    msg: String,
}

impl DnsError {
    pub fn new(rcode: Rcode, msg: impl Into<String>) -> Self {
        DnsError { rcode, msg: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        DnsError::new(Rcode::TRANSPORT, msg)
    }

    pub fn retryable(&self) -> bool {
        self.rcode.retryable()
    }
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rcode, self.msg)
    }
}

impl std::error::Error for DnsError {}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::transport(err.to_string())
    }
}

impl From<hickory_proto::ProtoError> for DnsError {
    fn from(err: hickory_proto::ProtoError) -> Self {
        DnsError::transport(err.to_string())
    }
}

/// An invariant violation: a programming-level contract was broken (an
/// unknown qtype string, an invalid IP passed to `Reverse`). These are
/// never retried and never silently swallowed; callers propagate them.
#[derive(Debug)]
pub struct InvariantError {
    msg: String,
}

impl InvariantError {
    pub fn new(msg: impl Into<String>) -> Self {
        InvariantError { msg: msg.into() }
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violation: {}", self.msg)
    }
}

impl std::error::Error for InvariantError {}

/// Top-level engine error, the union of every failure a caller of this
/// crate's public API can observe.
#[derive(Debug)]
pub enum EngineError {
    Dns(DnsError),
    Invariant(InvariantError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Dns(e) => write!(f, "{e}"),
            EngineError::Invariant(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<DnsError> for EngineError {
    fn from(err: DnsError) -> Self {
        EngineError::Dns(err)
    }
}

impl From<InvariantError> for EngineError {
    fn from(err: InvariantError) -> Self {
        EngineError::Invariant(err)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
