pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod meaning;
pub mod nlp;
pub mod pipeline;
pub mod quiz;
pub mod state;
pub mod storage;
pub mod subtitles;
pub mod translate;
