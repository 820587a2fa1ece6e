extern crate diesel;

pub mod config;
pub mod db;
pub mod logger;
pub mod ml;
pub mod models;
pub mod services;
pub mod training;
pub mod web;
