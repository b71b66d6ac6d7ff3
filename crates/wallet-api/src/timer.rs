use std::time::Duration;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;

/// Delay source for retry and polling loops.
///
/// Browser builds back this with `setTimeout`; tests use [`Immediate`] so
/// bounded loops run to completion without wall-clock waits.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Resolves every sleep immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Sleeper for Immediate {
    fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
        future::ready(()).boxed_local()
    }
}
