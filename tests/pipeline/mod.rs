mod loader;
mod runner;
