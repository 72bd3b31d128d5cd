use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // This means that 100%% also works, but I think I'm fine with that
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of a total expressed in minutes. A zero total maps to 0% so empty
/// ranges don't divide by zero.
pub fn minutes_share(minutes: u64, total_minutes: u64) -> Percentage {
    if total_minutes == 0 {
        return Percentage(0.);
    }
    Percentage::new_opt(minutes as f64 / total_minutes as f64 * 100.)
        .expect("Percentage should always be at least 0")
}

#[cfg(test)]
mod tests {
    use super::minutes_share;

    #[test]
    fn test_minutes_share() {
        assert_eq!(*minutes_share(30, 120), 25.);
        assert_eq!(*minutes_share(0, 120), 0.);
        assert_eq!(*minutes_share(10, 0), 0.);
    }
}
