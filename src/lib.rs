//! smeta-structure: командная строка над движком `smeta-common`

pub mod cli;
pub mod config;
pub mod error;
pub mod workbook;
