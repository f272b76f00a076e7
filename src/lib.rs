//! Foodgram - A recipe sharing backend
//!
//! This library provides the core functionality for Foodgram: recipes,
//! reference data, favorites, subscriptions and shopping lists.

pub mod api;
pub mod config;
pub mod db;
pub mod fixtures;
pub mod models;
pub mod services;
