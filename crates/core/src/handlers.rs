//! Callback types shared between the session engine and browser drivers.
//!
//! Drivers invoke these when a page calls a function exposed on `window`
//! (see [`PageHandle::expose_function`](crate::driver::PageHandle::expose_function)).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Boxed async handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = crate::Result<()>> + Send>>;

/// Handler function: `E` -> async `Result<()>`.
pub type HandlerFn<E> = Arc<dyn Fn(E) -> HandlerFuture + Send + Sync>;

/// Handler bound to a function exposed on the page's `window`.
///
/// The page's call arguments arrive as one JSON array.
pub type ExposedFn = HandlerFn<Value>;

/// Boxes an async closure into an [`ExposedFn`].
pub fn exposed_fn<F, Fut>(handler: F) -> ExposedFn
where
	F: Fn(Value) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = crate::Result<()>> + Send + 'static,
{
	Arc::new(move |args: Value| -> HandlerFuture { Box::pin(handler(args)) })
}
