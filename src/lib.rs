pub mod save;
pub mod session;

pub use save::{SaveError, SaveFormat, SaveInfo, SaveStore};
pub use session::{Command, GameSession, InteractionEvent, SessionConfig, SessionError};
