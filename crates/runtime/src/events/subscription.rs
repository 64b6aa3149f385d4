//! Subscriber registration records.
//!
//! A subscription pairs a [`Handler`] with an optional [`Owner`]. The bus only
//! keeps a weak handle to the owner: once every strong reference is gone the
//! subscription is skipped and pruned on the next publish.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::Event;
use crate::error::{HandlerError, HandlerResult};

type SyncFn = dyn Fn(&Event) -> HandlerResult + Send + Sync;
type AsyncFn = dyn Fn(Event) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Identifier returned by `subscribe`, usable with `unsubscribe_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// A labelled event callback, either synchronous or returning a future.
#[derive(Clone)]
pub struct Handler {
    label: Cow<'static, str>,
    kind: HandlerKind,
}

#[derive(Clone)]
enum HandlerKind {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Handler {
    /// Wraps a callback that runs inline.
    pub fn sync<F>(label: impl Into<Cow<'static, str>>, handler: F) -> Self
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            kind: HandlerKind::Sync(Arc::new(handler)),
        }
    }

    /// Wraps a callback that returns a future.
    pub fn future<F, Fut>(label: impl Into<Cow<'static, str>>, handler: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            label: label.into(),
            kind: HandlerKind::Async(Arc::new(move |event| handler(event).boxed())),
        }
    }

    /// Name used in logs and metrics.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_async(&self) -> bool {
        matches!(self.kind, HandlerKind::Async(_))
    }

    /// Runs a synchronous handler with panic isolation.
    ///
    /// Returns `None` for async handlers, which must go through [`Self::spawnable`].
    pub(crate) fn call_sync(&self, event: &Event) -> Option<HandlerResult> {
        match &self.kind {
            HandlerKind::Sync(handler) => Some(
                catch_unwind(AssertUnwindSafe(|| handler(event)))
                    .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload))),
            ),
            HandlerKind::Async(_) => None,
        }
    }

    /// Builds an owned, panic-isolated future for an async handler.
    pub(crate) fn spawnable(&self, event: Event) -> Option<BoxFuture<'static, HandlerResult>> {
        let HandlerKind::Async(handler) = &self.kind else {
            return None;
        };
        let future = match catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(future) => future,
            Err(payload) => {
                let err = HandlerError::from_panic(payload);
                return Some(async move { Err(err) }.boxed());
            }
        };
        Some(
            AssertUnwindSafe(future)
                .catch_unwind()
                .map(|result| {
                    result.unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)))
                })
                .boxed(),
        )
    }

    /// Runs either kind of handler to completion.
    pub(crate) async fn call(&self, event: &Event) -> HandlerResult {
        if let Some(result) = self.call_sync(event) {
            return result;
        }
        match self.spawnable(event.clone()) {
            Some(future) => future.await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("label", &self.label)
            .field("async", &self.is_async())
            .finish()
    }
}

/// Weak handle to whatever object a subscription belongs to.
#[derive(Clone)]
pub struct Owner {
    weak: Weak<dyn Any + Send + Sync>,
    addr: usize,
}

impl Owner {
    pub fn of<T: Any + Send + Sync>(owner: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(owner);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        Self {
            weak,
            addr: Arc::as_ptr(owner) as *const () as usize,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }

    pub fn same_as(&self, other: &Owner) -> bool {
        self.addr == other.addr
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) owner: Option<Owner>,
    pub(crate) handler: Handler,
}

impl Subscription {
    pub(crate) fn is_live(&self) -> bool {
        self.owner.as_ref().is_none_or(Owner::is_alive)
    }
}
