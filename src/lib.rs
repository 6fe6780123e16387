pub mod examples;
pub mod listings;

use anyhow::Result;

pub trait Example: Send + Sync {
    fn description(&self) -> String;

    fn main(&self) -> Result<()>;
}
