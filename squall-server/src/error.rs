use squall_core::port_core_map::MapError;
use squall_core::runtime::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid --port-core-map")]
    PortCoreMap(#[from] MapError),

    #[error("{0}")]
    InvalidArgs(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("packet buffer pool exhausted on port {port}")]
    PoolExhausted { port: u16 },

    #[error("PortStats table is full; raise MAX_PORTS to support more than {max_ports} ports")]
    StatsTableFull { max_ports: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Framebuffer(#[from] squall_core::framebuffer::Error),
}
