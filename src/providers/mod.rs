pub mod actual_server;

pub use actual_server::{ActualServerClient, ActualServerConnector};
