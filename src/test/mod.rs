mod config;
mod sizing;
mod topology;
