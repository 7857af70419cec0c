//! Item types shared by the integration tests.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use stepgraph::item::{Item, MultiItem, SimpleItem};

/// Simple item carrying a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(pub String);

impl Text {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Item for Text {}
impl SimpleItem for Text {}

/// Simple item carrying a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count(pub i64);

impl Item for Count {}
impl SimpleItem for Count {}

/// Multi item kept in ascending order of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank(pub i64);

impl Item for Rank {}

impl MultiItem for Rank {
    const SORTED: bool = true;

    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Multi item in production order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub String);

impl Item for Line {}
impl MultiItem for Line {}

/// Simple item whose `close` is observable and may fail.
#[derive(Debug, Clone)]
pub struct Handle {
    pub closed: Arc<AtomicUsize>,
    pub fail_on_close: bool,
}

impl Handle {
    pub fn new(closed: Arc<AtomicUsize>, fail_on_close: bool) -> Self {
        Self {
            closed,
            fail_on_close,
        }
    }
}

impl Item for Handle {
    fn close(&self) -> anyhow::Result<()> {
        self.closed.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_on_close {
            anyhow::bail!("handle refused to close");
        }
        Ok(())
    }
}

impl SimpleItem for Handle {}
