//! Host context handed to every bound element render.
use std::{fmt, sync::Arc};
use xbind_query::{AbstractQueryEngine, InMemoryQueryClient, InstanceId};
use xbind_config::AbstractTransport;
#[cfg(feature = "http")]
use xbind_config::{
    http::{HttpClientParams, HttpTransport},
    Configurable,
};

#[cfg(feature = "http")]
use crate::Error;

/// Engine and transport shared by every bound element of an application.
#[derive(Clone)]
pub struct BindContext {
    pub engine: AbstractQueryEngine,
    pub transport: AbstractTransport,
}

impl BindContext {
    pub fn new(engine: AbstractQueryEngine, transport: AbstractTransport) -> Self {
        Self { engine, transport }
    }

    /// Fresh [`InMemoryQueryClient`] over `transport`.
    pub fn in_memory(transport: AbstractTransport) -> Self {
        Self::new(Arc::new(InMemoryQueryClient::new()), transport)
    }

    /// Build an [`HttpTransport`] from the optional `[http]` table of
    /// `config` and pair it with `engine`.
    #[cfg(feature = "http")]
    pub fn with_http(
        engine: AbstractQueryEngine,
        config: &toml::Value,
    ) -> Result<Self, Error> {
        let params = match config.get_config_value("http") {
            Some(http) => HttpClientParams::from_config(http)?,
            None => HttpClientParams::default(),
        };
        tracing::debug!(
            timeout = params.timeout,
            connect_timeout = params.connect_timeout,
            "http transport configured"
        );
        let transport = HttpTransport::from_params(&params)?;
        Ok(Self::new(engine, Arc::new(transport)))
    }

    #[cfg(feature = "http")]
    pub fn from_config(config: &toml::Value) -> Result<Self, Error> {
        Self::with_http(Arc::new(InMemoryQueryClient::new()), config)
    }

    /// Scope for a newly mounted instance.
    pub fn scope(&self) -> Scope {
        Scope::new(self.clone())
    }
}

impl fmt::Debug for BindContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindContext").finish_non_exhaustive()
    }
}

/// Context of one mounted element instance. Hosts keep the scope alive for
/// as long as the instance is mounted and pass it to every render.
#[derive(Debug, Clone)]
pub struct Scope {
    ctx: BindContext,
    instance: InstanceId,
}

impl Scope {
    pub fn new(ctx: BindContext) -> Self {
        Self::with_instance(ctx, InstanceId::next())
    }

    pub fn with_instance(ctx: BindContext, instance: InstanceId) -> Self {
        Self { ctx, instance }
    }

    pub fn ctx(&self) -> &BindContext {
        &self.ctx
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}
