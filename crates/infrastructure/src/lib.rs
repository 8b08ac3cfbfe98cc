//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_login_attempt_store;
mod postgres_login_attempt_store;
mod postgres_user_repository;
mod redis_login_attempt_store;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_login_attempt_store::InMemoryLoginAttemptStore;
pub use postgres_login_attempt_store::PostgresLoginAttemptStore;
pub use postgres_user_repository::PostgresUserRepository;
pub use redis_login_attempt_store::RedisLoginAttemptStore;
