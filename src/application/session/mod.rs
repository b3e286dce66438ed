//! Session lifecycle: an idle session becomes active when an agent is built
//! from the current configuration, and goes back to idle on reset.

mod controller;
mod error;
mod notice;
mod outcome;
mod state;


pub use controller::{
    ACTIVATED_MESSAGE, ConfigurationSource, EnvConfigurationSource, NOT_ACTIVATED_MESSAGE,
    RESET_MESSAGE, SessionController, SessionStatus,
};
pub use error::ActivationError;
pub use notice::{Notice, NoticeLevel};
pub use outcome::{QueryOutcome, SubmitOutcome};
pub use state::{Session, SessionState};
