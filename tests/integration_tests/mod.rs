mod common;

mod mod_aggregate;
mod mod_client;
mod mod_config;
mod mod_index;
mod mod_query;
mod mod_runner;
