//! Account management module.
//!
//! Provides account configuration, storage, validation and the save pipeline.

mod model;
mod repository;
mod service;
mod validation;

pub use model::{
    Account, AccountId, AutoReplySettings, DEFAULT_UNREPLIED_MINUTES, DefaultRole, IncomingConfig,
    OutgoingConfig, Security, UnrepliedSettings, parse_recipient_list,
};
pub use repository::AccountRepository;
pub(crate) use repository::SCHEMA;
pub use service::AccountService;
pub use validation::{ValidationError, ValidationResult, is_valid_email, validate_account};
