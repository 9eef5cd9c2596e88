// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - show the effective configuration

use super::Context;
use anyhow::{bail, Result};
use prd_tracker::config::user_config_file;

/// Print the effective configuration as TOML, or the user config path
pub fn run(ctx: &Context, path: bool) -> Result<()> {
    if path {
        match user_config_file() {
            Some(file) => println!("{}", file.display()),
            None => bail!("No configuration directory on this platform"),
        }
        return Ok(());
    }

    let mut shown = ctx.config.clone();
    if shown.github.token.is_some() {
        shown.github.token = Some("********".to_string());
    }
    print!("{}", shown.to_toml()?);
    Ok(())
}
