// orderdesk - chat with a store database through an LLM SQL agent
// Library exports

pub mod agent;
pub mod cli;
pub mod config;
pub mod db;
pub mod logging;
pub mod orders;
pub mod providers;
pub mod tools;
