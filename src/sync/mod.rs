//! Desired-channel synchronization agent.
//!
//! A region entity in the hosting world declares, via an attribute, the
//! channel it wants to exist. The agent polls that attribute and mirrors
//! changes to the control service: remove the channel it was tracking,
//! create the newly desired one. When the host entity goes away the agent
//! makes a final removal call and stops for good.

mod agent;
mod attribute;

pub use agent::{AgentState, SyncAgent};
pub use attribute::{AttributeSource, FileAttributeSource};
