//! Auth module: domain types, the user-store seam, token and session plumbing, and the
//! flows that tie them together in [`AuthService`].

pub mod domain;
pub mod errors;
pub mod notification;
pub mod password;
pub mod repo;
pub mod repository;
pub mod reset_session;
pub mod service;
pub mod session_cache;
pub mod token;
pub mod user_agent;
pub mod validation;

pub use domain::{AuthSession, LoginInput, RegisterInput, ResetPasswordInput, SessionProjection, User};
pub use errors::{AuthError, ConflictField, FieldError};
pub use notification::{AmqpTransport, MemoryTransport, NotificationDispatcher, NotificationEvent, NotificationTransport};
pub use password::PasswordPolicy;
pub use repository::mock::MockUserRepository;
pub use repository::UserRepository;
pub use service::{AuthConfig, AuthService};
pub use token::{Audience, TokenConfig, TokenError, TokenService};
