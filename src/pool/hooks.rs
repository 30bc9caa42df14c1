//! Caller-supplied lifecycle callbacks.
use futures_util::future::BoxFuture;

use super::Resource;

/// Opens a new resource.
pub type CreateFn<T> = dyn Fn() -> BoxFuture<'static, Result<T, anyhow::Error>> + Send + Sync;

/// Tears a resource down. Takes precedence over [`Resource::close`].
pub type DestroyFn<T> = dyn Fn(T) -> BoxFuture<'static, Result<(), anyhow::Error>> + Send + Sync;

/// Probes a resource for liveness. Any error means the resource is dead.
pub type HeartbeatFn<T> =
    dyn for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<(), anyhow::Error>> + Send + Sync;

pub(crate) struct Hooks<T> {
    pub(crate) create: Box<CreateFn<T>>,
    pub(crate) destroy: Option<Box<DestroyFn<T>>>,
    pub(crate) heartbeat: Option<Box<HeartbeatFn<T>>>,
}

impl<T: Resource> Hooks<T> {
    pub(crate) async fn create(&self) -> Result<T, anyhow::Error> {
        (self.create)().await
    }

    pub(crate) async fn destroy(&self, resource: T) -> Result<(), anyhow::Error> {
        match &self.destroy {
            Some(destroy) => destroy(resource).await,
            None => resource.close().await,
        }
    }
}
