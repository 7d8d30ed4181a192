// tests/property/main.rs

mod buffer;
mod command;
