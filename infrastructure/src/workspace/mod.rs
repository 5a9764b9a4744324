//! Workspace adapter: [`LocalWorkspace`] implements
//! [`WorkspacePort`](ratchet_application::WorkspacePort) on the local disk.

mod local;

pub use local::LocalWorkspace;
