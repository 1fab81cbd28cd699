pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Boxed future type used by the driver trait so implementations stay
/// object safe.
pub type DynFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
