use anyhow::bail;
use clap::{Parser, Subcommand};
use core::time::Duration;
use sleepsort::{
    ConcurrentSleepSort, DEFAULT_MAX_ROUNDS, Error, SequentialSleepSort, SimpleSleepSort,
    StreamSorter,
};

/// Largest accepted `--rounds`. Beyond this the doubling multiplier saturates
/// and the extra rounds only repeat the last one.
pub const MAX_ROUNDS: u32 = 32;

/// Runtime configuration for the `sleepsort` binary.
///
/// Every global option can also be supplied through the environment (or a
/// `.env` file), which is handy when benchmarking the same list repeatedly.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sleepsort",
    version,
    about = "Sleep Sort lazily sorts using sleepy time"
)]
pub struct CliArgs {
    /// Number of items to generate.
    ///
    /// Environment variable: `ITEMS`
    #[arg(long, global = true, env = "ITEMS", default_value_t = 100)]
    pub items: usize,

    /// Seed the item generator from OS entropy instead of a fixed seed.
    ///
    /// Without it every run sorts the same list.
    ///
    /// Environment variable: `SEED`
    #[arg(long, global = true, env = "SEED", default_value_t = false)]
    pub seed: bool,

    /// Exclusive upper bound of generated item values.
    ///
    /// Environment variable: `MAX_VALUE`
    #[arg(long, global = true, env = "MAX_VALUE", default_value_t = 10_000)]
    pub max_value: u64,

    /// Time slept per unit of `value * multiplier`, in microseconds.
    ///
    /// Environment variable: `UNIT_US`
    #[arg(long, global = true, env = "UNIT_US", default_value_t = 1_000)]
    pub unit_us: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Execute sleep sorts concurrently
    Concurrent {
        /// Number of extra doubling rounds launched alongside the first.
        ///
        /// Environment variable: `ROUNDS`
        #[arg(long, env = "ROUNDS", default_value_t = DEFAULT_MAX_ROUNDS)]
        rounds: u32,
    },
    /// Execute sleep sorts sequentially
    Sequential,
    /// Execute a single sleep sort using a simple implementation
    Simple,
}

#[derive(Debug, Clone)]
pub struct SortConfig {
    pub items: usize,
    pub seed: bool,
    pub max_value: u64,
    pub unit: Duration,
    pub command: Command,
}

impl SortConfig {
    /// Builds the sorter selected by the subcommand.
    pub fn sorter(&self) -> Box<dyn StreamSorter + Send + Sync> {
        match self.command {
            Command::Concurrent { rounds } => {
                Box::new(ConcurrentSleepSort::new(rounds).with_unit(self.unit))
            }
            Command::Sequential => Box::new(SequentialSleepSort::default().with_unit(self.unit)),
            Command::Simple => Box::new(SimpleSleepSort::default().with_unit(self.unit)),
        }
    }

    /// Whether a sort whose last result carried `failure` should fail the
    /// process.
    ///
    /// The simple variant has no convergence to fail, so it never does, even
    /// when interrupted.
    pub const fn fails_process(&self, failure: Option<Error>) -> bool {
        !matches!(self.command, Command::Simple) && failure.is_some()
    }

    /// One-line description of what is about to run.
    pub fn banner(&self) -> String {
        match self.command {
            Command::Concurrent { rounds } => {
                let suffix = if rounds == 1 { "" } else { "s" };
                format!(
                    "Sleep sorting {} items concurrently using {rounds} round{suffix}",
                    self.items
                )
            }
            Command::Sequential => format!("Sleep sorting {} items sequentially", self.items),
            Command::Simple => format!(
                "Sleep sorting {} items simply with a single round",
                self.items
            ),
        }
    }
}

impl TryFrom<CliArgs> for SortConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_value == 0 {
            bail!("MAX_VALUE must be greater than 0");
        }

        if args.unit_us == 0 {
            bail!("UNIT_US must be greater than 0");
        }

        if let Command::Concurrent { rounds } = args.command {
            if rounds > MAX_ROUNDS {
                bail!("ROUNDS ({rounds}) exceeds the maximum of {MAX_ROUNDS}");
            }
        }

        Ok(Self {
            items: args.items,
            seed: args.seed,
            max_value: args.max_value,
            unit: Duration::from_micros(args.unit_us),
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> anyhow::Result<SortConfig> {
        let args = CliArgs::try_parse_from(argv)?;
        SortConfig::try_from(args)
    }

    #[test]
    fn concurrent_defaults() {
        let config = parse(&["sleepsort", "concurrent"]).unwrap();
        assert_eq!(config.items, 100);
        assert!(!config.seed);
        assert_eq!(config.max_value, 10_000);
        assert_eq!(config.unit, Duration::from_millis(1));
        assert_eq!(
            config.command,
            Command::Concurrent {
                rounds: DEFAULT_MAX_ROUNDS
            }
        );
        assert_eq!(
            config.banner(),
            "Sleep sorting 100 items concurrently using 7 rounds"
        );
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let config = parse(&[
            "sleepsort",
            "sequential",
            "--items",
            "5",
            "--seed",
            "--unit-us",
            "250",
        ])
        .unwrap();
        assert_eq!(config.items, 5);
        assert!(config.seed);
        assert_eq!(config.unit, Duration::from_micros(250));
        assert_eq!(config.command, Command::Sequential);
    }

    #[test]
    fn single_round_banner_is_singular() {
        let config = parse(&["sleepsort", "concurrent", "--rounds", "1"]).unwrap();
        assert_eq!(
            config.banner(),
            "Sleep sorting 100 items concurrently using 1 round"
        );
    }

    #[test]
    fn only_orchestrated_failures_fail_the_process() {
        let simple = parse(&["sleepsort", "simple"]).unwrap();
        assert!(!simple.fails_process(None));
        assert!(!simple.fails_process(Some(Error::Cancelled)));

        let concurrent = parse(&["sleepsort", "concurrent"]).unwrap();
        assert!(!concurrent.fails_process(None));
        assert!(concurrent.fails_process(Some(Error::SortFailed)));

        let sequential = parse(&["sleepsort", "sequential"]).unwrap();
        assert!(sequential.fails_process(Some(Error::Cancelled)));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse(&["sleepsort", "simple", "--max-value", "0"]).is_err());
        assert!(parse(&["sleepsort", "simple", "--unit-us", "0"]).is_err());
        assert!(parse(&["sleepsort", "concurrent", "--rounds", "33"]).is_err());
        assert!(parse(&["sleepsort"]).is_err());
    }
}
