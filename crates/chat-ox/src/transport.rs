use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::request::ChatRequest;
use crate::response::ChatResponse;

/// Sends a chat request to a provider and returns its response.
///
/// Implemented by provider clients. Errors are handed back to the caller
/// without being interpreted.
pub trait ChatTransport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send<'a>(&'a self, request: &'a ChatRequest)
    -> BoxFuture<'a, Result<ChatResponse, Self::Error>>;
}

impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    type Error = T::Error;

    fn send<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, Self::Error>> {
        (**self).send(request)
    }
}

impl<T: ChatTransport + ?Sized> ChatTransport for &T {
    type Error = T::Error;

    fn send<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ChatResponse, Self::Error>> {
        (**self).send(request)
    }
}
