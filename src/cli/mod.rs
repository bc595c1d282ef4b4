//! CLI commands for sessiondb.
//!
//! - **Setup**: init (project config and session table)
//! - **Session commands**: read, write, destroy
//! - **Maintenance**: gc

pub mod gc;
pub mod init;
pub mod session;

pub use gc::GcCommand;
pub use init::InitCommand;
pub use session::SessionCommand;
