//! `deplocatr`: inventory a project's dependencies across ecosystems.
//!
//! # Flow
//! 1. Build the module list ([`config::modules`], [`detector`]).
//! 2. Run one analyzer per module ([`analyze`], [`analyzer`]).
//! 3. Fold the results into source units keyed by canonical locators
//!    ([`normalize`], [`locator`]).
//! 4. Write, upload or report on them ([`report`], [`api`]).

pub mod analyze;
pub mod analyzer;
pub mod api;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod locator;
pub mod module;
pub mod normalize;
pub mod pkg;
pub mod report;
pub mod ui;
