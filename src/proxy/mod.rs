//! Egress proxy rotation
//!
//! Discovery jobs route their outbound requests through a fixed list of
//! proxies, handed out in round-robin order. An empty list means requests go
//! out directly.

mod rotator;

pub use rotator::ProxyRotator;
