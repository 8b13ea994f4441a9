use rand::{seq::SliceRandom, Rng};
use std::fmt;

/// Consonants only, so remembered letters never spell words
pub const CONSONANTS: &str = "BCDFGHJKLMNPQRSTVWXYZ";

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    const ALL: [Operator; 3] = [Operator::Add, Operator::Sub, Operator::Mul];

    pub fn apply(&self, lhs: i32, rhs: i32) -> i32 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Sub => lhs - rhs,
            Operator::Mul => lhs * rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Add => "+",
            Operator::Sub => "−",
            Operator::Mul => "×",
        };
        f.write_str(symbol)
    }
}

/// An arithmetic statement the subject must judge as true or false
#[derive(Debug, Clone, PartialEq)]
pub struct MathProbe {
    pub lhs: i32,
    pub operator: Operator,
    pub rhs: i32,
    pub true_result: i32,
    pub displayed_result: i32,
    /// whether the subject judged the statement correctly; None until answered
    pub judged_correctly: Option<bool>,
}

impl MathProbe {
    pub fn new(lhs: i32, operator: Operator, rhs: i32, displayed_result: i32) -> Self {
        Self {
            lhs,
            operator,
            rhs,
            true_result: operator.apply(lhs, rhs),
            displayed_result,
            judged_correctly: None,
        }
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let operator = *Operator::ALL.choose(rng).unwrap_or(&Operator::Add);
        let (lhs, rhs) = match operator {
            Operator::Mul => (rng.gen_range(2..=10), rng.gen_range(2..=10)),
            Operator::Add => (rng.gen_range(10..=59), rng.gen_range(10..=59)),
            Operator::Sub => (rng.gen_range(30..=79), rng.gen_range(5..=24)),
        };
        let true_result = operator.apply(lhs, rhs);
        let displayed_result = if rng.gen_bool(0.5) {
            true_result
        } else {
            let offset = rng.gen_range(1..=5);
            if rng.gen_bool(0.5) {
                true_result + offset
            } else {
                true_result - offset
            }
        };
        Self::new(lhs, operator, rhs, displayed_result)
    }

    pub fn is_displayed_true(&self) -> bool {
        self.displayed_result == self.true_result
    }

    /// Records the subject's verdict on the displayed statement
    pub fn judge(&mut self, says_true: bool) {
        self.judged_correctly = Some(says_true == self.is_displayed_true());
    }

    pub fn statement(&self) -> String {
        format!(
            "{} {} {} = {}?",
            self.lhs, self.operator, self.rhs, self.displayed_result
        )
    }
}

/// The symbols to recall for one round, plus OSPAN probes when applicable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trial {
    pub symbols: Vec<char>,
    pub probes: Vec<MathProbe>,
}

impl Trial {
    /// `level` distinct digits, drawn without replacement
    pub fn digits<R: Rng + ?Sized>(level: u8, rng: &mut R) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL) as usize;
        let mut pool: Vec<char> = ('0'..='9').collect();
        pool.shuffle(rng);
        pool.truncate(level);
        Self {
            symbols: pool,
            probes: Vec::new(),
        }
    }

    /// One consonant (with replacement) and one math probe per position
    pub fn ospan<R: Rng + ?Sized>(level: u8, rng: &mut R) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL) as usize;
        let alphabet: Vec<char> = CONSONANTS.chars().collect();
        let mut symbols = Vec::with_capacity(level);
        let mut probes = Vec::with_capacity(level);
        for _ in 0..level {
            symbols.push(*alphabet.choose(rng).unwrap_or(&'B'));
            probes.push(MathProbe::generate(rng));
        }
        Self { symbols, probes }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn expected_answer(&self, reverse: bool) -> String {
        if reverse {
            self.symbols.iter().rev().collect()
        } else {
            self.symbols.iter().collect()
        }
    }

    pub fn all_probes_judged(&self) -> bool {
        self.probes.iter().all(|p| p.judged_correctly.is_some())
    }

    /// Fraction of probes judged correctly; None until every probe is answered
    pub fn math_accuracy(&self) -> Option<f64> {
        if self.probes.is_empty() || !self.all_probes_judged() {
            return None;
        }
        let correct = self
            .probes
            .iter()
            .filter(|p| p.judged_correctly == Some(true))
            .count();
        Some(correct as f64 / self.probes.len() as f64)
    }
}
