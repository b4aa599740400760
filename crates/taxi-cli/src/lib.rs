//! # taxi-cli: Operator CLI for the Taxi Fleet
//!
//! Provides the `taxi` command-line interface. Commands run offline against
//! the same taxi-core rules the service applies.
//!
//! ## Subcommands
//!
//! - `taxi license check`: Check license numbers against the `AAA99999`
//!   grammar, from arguments or a file.
//!
//! ```bash
//! taxi license check ABC12345 abc12345
//! taxi license check --file drivers.txt --json
//! ```

pub mod license;
