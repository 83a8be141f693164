pub mod domain;
pub mod matching;
pub mod sessions;
pub mod trust;
