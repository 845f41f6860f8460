// src/models/mod.rs

pub mod class;
pub mod exam;
pub mod submission;
pub mod user;
