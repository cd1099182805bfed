pub mod composer;
pub mod engine;
pub mod error;
pub mod notice;
pub mod phase;
pub mod session;
pub mod usage;

#[cfg(test)]
mod testing;

pub use composer::{Composer, UploadFailure};
pub use engine::{Applied, HydrationSource, Reconciler};
pub use error::{SubmitRejected, TurnError};
pub use notice::{Notice, Notifier, login_redirect};
pub use phase::{Input, Phase, Status};
pub use session::{ChatSession, MountOptions, SessionConfig, Step};
pub use usage::UsageTracker;
