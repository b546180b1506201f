// src/lib.rs
pub use accounts::AccountFlow;
pub use config::{GatehouseConfig, ResetPasswordConfig};
pub use error::{ErrorBody, ErrorKind, GatehouseError};
pub use gate::{Admission, AuthorizationGate};
pub use gatehouse::{Collaborators, Gatehouse};
pub use memory::MemoryStore;
pub use path::ResourcePath;
pub use pattern::{CompiledPattern, PathMatch};
pub use routes::OperationRoutes;
pub use traits::{
    KeyChecker, MailMessage, MailTransport, Mutation, NoKeys, PasswordHasher, QueryResults,
    Storage, TokenIssuer,
};
pub use types::{AccessControlEntry, Operation, Record, Request, Response, Subject};

pub mod accounts;
pub mod config;
mod error;
pub mod fields;
mod gate;
mod gatehouse;
mod memory;
mod path;
pub mod pattern;
pub mod roles;
pub mod routes;
mod traits;
pub mod types;
