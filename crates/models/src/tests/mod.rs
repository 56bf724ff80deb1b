/// Query helpers exercised against a live Postgres; skipped without one.
pub mod user_tests;
