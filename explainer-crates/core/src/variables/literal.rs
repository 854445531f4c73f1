use crate::variables::Indicator;

/// An [`Indicator`] with a certain polarity, i.e. either the indicator itself or its negation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    code: u32,
}

impl Literal {
    pub fn new(indicator: Indicator, is_positive: bool) -> Literal {
        Literal {
            code: indicator.id() * 2 + (is_positive as u32),
        }
    }

    pub fn is_positive(&self) -> bool {
        (self.code & 1) == 1
    }

    pub fn is_negative(&self) -> bool {
        (self.code & 1) == 0
    }

    pub fn indicator(&self) -> Indicator {
        Indicator::new(self.code / 2)
    }

    /// Evaluates the literal given the value of its indicator.
    pub fn evaluate(&self, indicator_value: bool) -> bool {
        indicator_value == self.is_positive()
    }
}

impl std::ops::Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal { code: self.code ^ 1 }
    }
}

impl From<Indicator> for Literal {
    fn from(indicator: Indicator) -> Self {
        indicator.positive()
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_negative() {
            write!(f, "~{}", self.indicator())
        } else {
            write!(f, "{}", self.indicator())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_flips_polarity_but_keeps_indicator() {
        let indicator = Indicator::new(7);
        let literal = indicator.positive();

        assert!(literal.is_positive());
        assert!((!literal).is_negative());
        assert_eq!((!literal).indicator(), indicator);
        assert_eq!(!!literal, literal);
    }

    #[test]
    fn evaluation_respects_polarity() {
        let indicator = Indicator::new(3);

        assert!(indicator.positive().evaluate(true));
        assert!(!indicator.positive().evaluate(false));
        assert!(indicator.negative().evaluate(false));
    }
}
