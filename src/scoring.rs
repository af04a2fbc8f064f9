//! Scoring Engine (C10).
//!
//! Combines the per-category percentages into one overall score and maps it
//! to a letter grade.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryScores {
    pub authentication: u8,
    pub blacklist: u8,
    pub content: u8,
    pub header: u8,
    pub spam: u8,
}

impl CategoryScores {
    fn values(&self) -> [u8; 5] {
        [self.authentication, self.blacklist, self.content, self.header, self.spam]
    }
}

/// Arithmetic mean of the five category scores, floored to an integer.
pub fn overall_score(scores: &CategoryScores) -> u8 {
    let values = scores.values();
    let sum: u32 = values.iter().map(|&v| v as u32).sum();
    (sum as f64 / values.len() as f64).floor() as u8
}

/// Maps an overall score to a letter grade per the fixed bins:
/// `[97,100]=A+`, `[93,97)=A`, `[85,93)=B`, `[75,85)=C`, `[65,75)=D`,
/// `[50,65)=E`, `[0,50)=F`.
pub fn grade_for_score(score: u8) -> Grade {
    match score {
        97..=100 => Grade::APlus,
        93..=96 => Grade::A,
        85..=92 => Grade::B,
        75..=84 => Grade::C,
        65..=74 => Grade::D,
        50..=64 => Grade::E,
        _ => Grade::F,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_score_is_floored_mean() {
        let scores = CategoryScores {
            authentication: 100,
            blacklist: 83,
            content: 100,
            header: 100,
            spam: 100,
        };
        // mean = 96.6 -> floor -> 96
        assert_eq!(overall_score(&scores), 96);
    }

    #[test]
    fn grade_boundaries_are_inclusive_lower() {
        assert_eq!(grade_for_score(97).as_str(), "A+");
        assert_eq!(grade_for_score(96).as_str(), "A");
        assert_eq!(grade_for_score(93).as_str(), "A");
        assert_eq!(grade_for_score(92).as_str(), "B");
        assert_eq!(grade_for_score(85).as_str(), "B");
        assert_eq!(grade_for_score(84).as_str(), "C");
        assert_eq!(grade_for_score(65).as_str(), "D");
        assert_eq!(grade_for_score(64).as_str(), "E");
        assert_eq!(grade_for_score(50).as_str(), "E");
        assert_eq!(grade_for_score(49).as_str(), "F");
        assert_eq!(grade_for_score(0).as_str(), "F");
    }

    #[test]
    fn grade_is_monotonic_in_score() {
        let mut prev_rank = -1i32;
        let rank = |g: Grade| match g {
            Grade::F => 0,
            Grade::E => 1,
            Grade::D => 2,
            Grade::C => 3,
            Grade::B => 4,
            Grade::A => 5,
            Grade::APlus => 6,
        };
        for score in 0..=100u8 {
            let r = rank(grade_for_score(score)) as i32;
            assert!(r >= prev_rank);
            prev_rank = r;
        }
    }
}
