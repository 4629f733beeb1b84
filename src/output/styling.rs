use console::{style, StyledObject};

/// Traffic-light classification used by every colour-coded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
}

impl Tone {
    /// Tone for a value where higher is worse.
    pub fn higher_is_worse(value: f64, warn_at: f64, bad_at: f64) -> Self {
        if value >= bad_at {
            Self::Bad
        } else if value >= warn_at {
            Self::Warn
        } else {
            Self::Good
        }
    }

    /// Tone for a value where higher is better.
    pub fn higher_is_better(value: f64, good_above: f64, warn_from: f64) -> Self {
        if value > good_above {
            Self::Good
        } else if value >= warn_from {
            Self::Warn
        } else {
            Self::Bad
        }
    }
}

pub fn toned(text: impl std::fmt::Display, tone: Tone) -> StyledObject<String> {
    let styled = style(text.to_string()).bright();
    match tone {
        Tone::Good => styled.green(),
        Tone::Warn => styled.yellow(),
        Tone::Bad => styled.red(),
    }
}

pub fn highlight(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_is_worse_thresholds() {
        assert_eq!(Tone::higher_is_worse(5.0, 25.0, 50.0), Tone::Good);
        assert_eq!(Tone::higher_is_worse(25.0, 25.0, 50.0), Tone::Warn);
        assert_eq!(Tone::higher_is_worse(50.0, 25.0, 50.0), Tone::Bad);
    }

    #[test]
    fn higher_is_better_thresholds() {
        assert_eq!(Tone::higher_is_better(90.0, 80.0, 50.0), Tone::Good);
        assert_eq!(Tone::higher_is_better(80.0, 80.0, 50.0), Tone::Warn);
        assert_eq!(Tone::higher_is_better(10.0, 80.0, 50.0), Tone::Bad);
    }
}
