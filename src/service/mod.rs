//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database, token signing and mail dispatch.

mod auth;
mod friendship;
mod messages;
mod users;
mod verification;

pub use auth::{AuthService, IssuedToken, LoginId};
pub use friendship::{
    FriendAction, FriendListing, FriendshipResult, FriendshipService, RequestListing,
    RespondOutcome, SentRequest,
};
pub use messages::{Direction, MessageService, MessageView};
pub use users::{UserProfile, UserService};
pub use verification::{IssuedCode, LogMailer, Mailer, VerificationService, VerifiedEmail};
