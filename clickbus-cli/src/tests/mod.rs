//! Shared test harness modules for the ClickBus CLI.

use super::*;

mod commands;
mod helpers;
