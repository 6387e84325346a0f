pub(crate) mod bootstrap;
pub(crate) mod data;
pub(crate) mod loop_runner;
pub(crate) mod overworld;
pub(crate) mod render;
pub(crate) mod session;
