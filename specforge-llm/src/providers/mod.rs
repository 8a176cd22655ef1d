//! Provider implementations of the `DesignModel` trait

pub mod anthropic;
