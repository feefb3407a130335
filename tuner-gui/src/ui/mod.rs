//! # UI Module
//!
//! This module contains all UI components for the HPS guitar tuner.

pub mod cent_meter;
pub mod main_display;
