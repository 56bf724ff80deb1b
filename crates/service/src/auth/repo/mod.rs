//! Concrete [`UserRepository`](super::repository::UserRepository) backends.

pub mod seaorm;

pub use seaorm::SeaOrmUserRepository;
