pub mod catalog;
pub mod config;
pub mod installer;
pub mod menu;
pub mod navigator;
pub mod scripts;
pub mod selection;
pub mod session;
pub mod stage;
