//! Invitation and approval workflow

mod approval;
mod invitations;
mod notifier;

pub use approval::*;
pub use invitations::*;
pub use notifier::*;
