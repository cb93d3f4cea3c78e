pub mod chat;
pub mod embeddings;
pub mod files;
pub mod health;
pub mod models;
