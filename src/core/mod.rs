pub mod board;
pub mod date;
pub mod task;
