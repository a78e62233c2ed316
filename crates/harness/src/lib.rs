pub mod faults;
pub mod server;
pub mod store;

pub use faults::{FailingInitializer, PanickingConnections, SqlScriptLoader};
pub use server::TestServer;
pub use store::{TestStore, rows};
