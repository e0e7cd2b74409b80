//! Concrete collaborators for the dispatch pipeline: the ticketing gateway,
//! the decision store and the outbound notification channels.

pub mod connectwise;
pub mod decision_log;
pub mod proposed_note;
pub mod teams;

pub use connectwise::ConnectWiseClient;
pub use decision_log::PgDecisionLog;
pub use proposed_note::ProposedNoteClient;
pub use teams::{TeamsAlerter, TeamsTarget};
