#![allow(non_camel_case_types)]

pub mod cache_keys;
pub mod cli;
pub mod configuration;
pub mod controller;
pub mod dao;
pub mod error;
pub mod handler;
pub mod helpers;
pub mod model;
pub mod provider;
pub mod server;

#[cfg(test)]
pub mod testing;
