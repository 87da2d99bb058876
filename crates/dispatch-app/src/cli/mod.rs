use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use dispatch_core::constants::AGGREGATE_PARTITION;
use dispatch_core::error::CoreResult;
use dispatch_core::types::DateKey;

#[derive(Parser, Debug)]
#[command(name = "dispatch")]
#[command(about = "Inspect and edit cast assignments for shop orders")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print the reconciled assignments of a date as JSON
    Show {
        /// `today`, `tomorrow`, `all` or `YYYY-MM-DD`
        date: DateArg,
    },
    /// List the orders of a date
    Orders {
        /// `today`, `tomorrow`, `all` or `YYYY-MM-DD`
        date: DateArg,
    },
    /// Add a cast to a shop's assignments
    Assign {
        /// `today`, `tomorrow` or `YYYY-MM-DD`
        date: DateArg,
        #[arg(long)]
        shop: String,
        #[arg(long)]
        cast_id: Option<String>,
        #[arg(long, default_value = "")]
        cast_code: String,
        #[arg(long, default_value = "")]
        cast_name: String,
        /// Agreed hourly rate
        #[arg(long)]
        rate: f64,
        #[arg(long)]
        note: Option<String>,
        /// Pin the row to one of the shop's orders
        #[arg(long)]
        order: Option<String>,
    },
    /// Remove one assignment by id
    Unassign {
        /// `today`, `tomorrow` or `YYYY-MM-DD`
        date: DateArg,
        assignment_id: String,
    },
    /// Confirm an order
    Confirm { order_id: String },
    /// Cancel an order
    Cancel { order_id: String },
}

/// Date argument as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateArg {
    Today,
    Tomorrow,
    /// The undated aggregate partition.
    All,
    Day(DateKey),
}

impl DateArg {
    /// ## Summary
    /// Resolves the argument to a partition key in the given time zone.
    /// `All` resolves to `None`.
    ///
    /// ## Errors
    /// Returns an error if tomorrow is not a representable date.
    pub fn resolve(self, tz: Tz) -> CoreResult<Option<DateKey>> {
        Ok(match self {
            Self::Today => Some(DateKey::today(tz)),
            Self::Tomorrow => Some(DateKey::tomorrow(tz)?),
            Self::All => None,
            Self::Day(key) => Some(key),
        })
    }
}

impl FromStr for DateArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            AGGREGATE_PARTITION => Ok(Self::All),
            other => DateKey::parse(other)
                .map(Self::Day)
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for DateArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Tomorrow => f.write_str("tomorrow"),
            Self::All => f.write_str(AGGREGATE_PARTITION),
            Self::Day(key) => write!(f, "{key}"),
        }
    }
}

#[cfg(test)]
mod tests;
