mod client;

pub use mentor_realtime_types as types;

pub use client::{Client, ClientTx, Config, ConfigBuilder, EventRx, connect, connect_with_config};
