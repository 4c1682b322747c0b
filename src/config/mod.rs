// src/config/mod.rs
pub mod rating;

pub use rating::{
    load_config_default, load_config_from, parse_categories, RatingConfig, RatingScale,
    ENV_CONFIG_PATH, PLUGIN_ID,
};
