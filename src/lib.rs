#![forbid(unsafe_code)]

pub mod books;
pub mod catalog;
pub mod chapter_number;
pub mod chapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod details;
pub mod error;
pub mod formats;
pub mod html;
pub mod inference;
pub mod logging;
pub mod pages;
pub mod path_match;
pub mod search;
pub mod session;
pub mod site;
