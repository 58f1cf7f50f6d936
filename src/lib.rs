pub mod ai;
pub mod board;
pub mod config;
pub mod console;
pub mod error;
pub mod game;
pub mod movegen;
