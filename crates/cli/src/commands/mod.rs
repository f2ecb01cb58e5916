pub mod ask;
pub mod assistant;
pub mod chat;
pub mod ingest;
pub mod onboard;
pub mod scheduler;
pub mod tools;
