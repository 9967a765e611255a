use std::{
    net::SocketAddr,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Upstream servers, handed out in round-robin order.
#[derive(Debug)]
pub struct Upstreams {
    list: Box<[SocketAddr]>,
    rr: AtomicUsize,
}

impl Upstreams {
    pub fn new(addrs: &[SocketAddr]) -> Self {
        Self {
            list: addrs.into(),
            rr: AtomicUsize::new(0),
        }
    }

    /// Pick an upstream index in round-robin fashion.
    pub fn pick_index(&self) -> Option<usize> {
        let n = self.list.len();
        if n == 0 {
            return None;
        }
        Some(self.rr.fetch_add(1, Ordering::Relaxed) % n)
    }

    pub fn as_slice(&self) -> &[SocketAddr] {
        &self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
