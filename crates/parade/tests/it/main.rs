pub(crate) mod common;

mod basic;
mod configuration;
mod discovery;
