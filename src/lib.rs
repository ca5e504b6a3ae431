//! studycam - camera-driven study companion
//!
//! This library periodically captures a frame of a student's desk, asks a
//! vision model whether the student is present and what they are working on,
//! keeps a rolling history of the results, and speaks short feedback.

pub mod agent;
pub mod capture;
pub mod cli;
pub mod config;
pub mod history;
pub mod logging;
