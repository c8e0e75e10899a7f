//!  Storage is organized through [gateway::PersistenceGateway].
//!  The basic idea is:
//!   - There is a string keyed store, usually a directory of json files ([key_value::FileStore]).
//!   - Exactly two keys are used: the active session and the list of completed logs.
//!   - The list of logs is rewritten in full on every append.

pub mod entities;
pub mod error;
pub mod gateway;
pub mod key_value;
