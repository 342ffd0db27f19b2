mod resources;
mod scenarios;
