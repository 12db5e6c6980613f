// Typed JSON payload handler

use crate::port::{Delivery, HandlerContext, PayloadHandler, PayloadProcessingError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Business logic over a decoded payload
#[async_trait]
pub trait TypedHandler<T: Send + 'static>: Send + Sync {
    fn expected_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    async fn handle(
        &self,
        payload: T,
        delivery: &Delivery,
        ctx: &HandlerContext,
    ) -> Result<(), PayloadProcessingError>;
}

/// Decodes the body as JSON before calling the inner handler.
/// A body that does not decode is a processing failure.
pub struct JsonHandler<T, H> {
    inner: H,
    _payload: PhantomData<fn() -> T>,
}

impl<T, H> JsonHandler<T, H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<T, H> PayloadHandler for JsonHandler<T, H>
where
    T: DeserializeOwned + Send + 'static,
    H: TypedHandler<T>,
{
    fn expected_attributes(&self) -> Vec<String> {
        self.inner.expected_attributes()
    }

    async fn handle(
        &self,
        delivery: Delivery,
        ctx: HandlerContext,
    ) -> Result<(), PayloadProcessingError> {
        let payload: T = serde_json::from_str(&delivery.body)?;
        self.inner.handle(payload, &delivery, &ctx).await
    }
}
