//! Data model shared by the gate, the mutators and the credential flow.
//!
//! Records are untyped JSON objects because entity shapes belong to the
//! storage adapter; only the reserved fields below carry meaning here.

mod acl;
mod item;
mod operation;
mod record;
mod request;
mod subject;

pub use acl::{ALL_SUBJECTS, AccessControlEntry, Permission, SubjectKey};
pub use item::ArrayItem;
pub use operation::{Convention, Operation};
pub use record::{
    ACCESS_TOKEN_FIELD, ACL_FIELD, CREATED_AT_FIELD, EMAIL_FIELD, Headers, ID_FIELD, ITEMS_FIELD,
    MESSAGE_FIELD, NEW_PASSWORD_FIELD, PASSWORD_FIELD, QueryParams, ROLES_FIELD, Record,
    UPDATED_AT_FIELD, USERNAME_FIELD, WHERE_PARAM, eq_fold, into_record,
};
pub use request::{Request, Response};
pub use subject::Subject;
