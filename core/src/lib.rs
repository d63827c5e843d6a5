pub mod cash;
pub mod clock;
pub mod command;
pub mod config;
pub mod customer;
pub mod engine;
pub mod error;
pub mod event;
pub mod inventory;
pub mod name_generator;
pub mod purchase;
pub mod reputation;
pub mod rng;
pub mod scheduler;
pub mod shelf;
pub mod stats;
pub mod store;
pub mod till;
pub mod types;
