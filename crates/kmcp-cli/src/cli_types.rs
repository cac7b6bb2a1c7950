use clap::ValueEnum;

use kmcp_ops::PathPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliPathPolicy {
    Permissive,
    Confined,
}

impl From<CliPathPolicy> for PathPolicy {
    fn from(value: CliPathPolicy) -> Self {
        match value {
            CliPathPolicy::Permissive => PathPolicy::Permissive,
            CliPathPolicy::Confined => PathPolicy::Confined,
        }
    }
}
