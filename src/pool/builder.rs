use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::hooks::Hooks;
use super::{ConfigError, Connection, Pool, PoolSettings, Resource};
use crate::channel::{Backend, Channel};

/// A builder for [`Pool`].
///
/// Use [`Pool::builder`] as entrypoint.
pub struct PoolBuilder<T> {
    settings: PoolSettings,
    hooks: Hooks<T>,
    channel: Option<Channel<Connection<T>>>,
}

impl<T: Resource> PoolBuilder<T> {
    pub(super) fn new<F, Fut>(creator: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, anyhow::Error>> + Send + 'static,
    {
        Self {
            settings: PoolSettings::default(),
            hooks: Hooks {
                create: Box::new(move || creator().boxed()),
                destroy: None,
                heartbeat: None,
            },
            channel: None,
        }
    }

    /// Replace every setting at once, e.g. with values deserialized from a configuration file.
    #[must_use]
    pub fn with_settings(mut self, settings: PoolSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Change the maximum number of connections the pool opens.
    ///
    /// Default: 1.
    #[must_use]
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.settings.max_connections = max_connections;
        self
    }

    /// Change the number of free connections idle eviction leaves alone.
    ///
    /// Default: 1.
    #[must_use]
    pub fn min_connections(mut self, min_connections: usize) -> Self {
        self.settings.min_connections = min_connections;
        self
    }

    /// Default: 60 seconds.
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.settings.idle_timeout_seconds = idle_timeout.as_secs_f64();
        self
    }

    /// Default: 50 seconds.
    #[must_use]
    pub fn heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.settings.heartbeat_interval_seconds = heartbeat_interval.as_secs_f64();
        self
    }

    /// Default: 10 seconds.
    #[must_use]
    pub fn wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.settings.wait_timeout_seconds = wait_timeout.as_secs_f64();
        self
    }

    /// Pick the channel backend used for the free-list.
    ///
    /// Default: [`Backend::Auto`], resolved when [`PoolBuilder::build`] is called.
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.settings.backend = backend;
        self
    }

    /// Use a ready-made channel as the free-list instead of building one from
    /// [`PoolSettings::backend`].
    ///
    /// The channel must be able to hold `max_connections` connections.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel<Connection<T>>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Tear connections down with `destroyer` rather than [`Resource::close`].
    ///
    /// Errors are logged, never returned to the caller.
    #[must_use]
    pub fn with_destroyer<F, Fut>(mut self, destroyer: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.hooks.destroy = Some(Box::new(move |resource| destroyer(resource).boxed()));
        self
    }

    /// Probe free connections with `heartbeat` every
    /// [`heartbeat_interval`](PoolBuilder::heartbeat_interval).
    ///
    /// A failed probe closes the connection.
    ///
    /// ```rust
    /// use coop_pool::{Pool, Resource};
    ///
    /// struct Session;
    ///
    /// impl Session {
    ///     async fn ping(&mut self) -> Result<(), anyhow::Error> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// impl Resource for Session {}
    ///
    /// let builder = Pool::builder(|| async { Ok(Session) })
    ///     .with_heartbeat(|session: &mut Session| Box::pin(session.ping()));
    /// # drop(builder);
    /// ```
    #[must_use]
    pub fn with_heartbeat<F>(mut self, heartbeat: F) -> Self
    where
        F: for<'a> Fn(&'a mut T) -> BoxFuture<'a, Result<(), anyhow::Error>>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.heartbeat = Some(Box::new(heartbeat));
        self
    }

    /// Validate the settings and create the [`Pool`].
    ///
    /// No connection is opened at this point: the pool grows lazily on [`Pool::get`].
    pub fn build(self) -> Result<Pool<T>, ConfigError> {
        let Self {
            settings,
            hooks,
            channel,
        } = self;
        settings.validate()?;

        let channel = match channel {
            Some(channel) if channel.capacity() < settings.max_connections => {
                return Err(ConfigError::ChannelTooSmall {
                    capacity: channel.capacity(),
                    max: settings.max_connections,
                });
            }
            Some(channel) => channel,
            None => Channel::new(settings.backend, settings.max_connections),
        };
        Ok(Pool::new(settings, hooks, channel))
    }
}
