#![allow(dead_code)]

pub mod account;
pub mod config;
pub mod core;
pub mod remote;
pub mod session;
pub mod theme;
