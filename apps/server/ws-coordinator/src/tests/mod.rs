mod error;
mod settings;
