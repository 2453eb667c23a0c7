/// Per-run totals of upload outcomes.
///
/// Every processed file lands in exactly one of the outcome counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_uploaded: u64,
    pub files_uploaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub files_interrupted: usize,
    pub files_not_attempted: usize,
}

impl Summary {
    /// Number of files that reached a recorded outcome
    #[must_use]
    pub fn files_processed(&self) -> usize {
        self.files_uploaded
            + self.files_skipped
            + self.files_failed
            + self.files_interrupted
            + self.files_not_attempted
    }
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_uploaded: self.bytes_uploaded + other.bytes_uploaded,
            files_uploaded: self.files_uploaded + other.files_uploaded,
            files_skipped: self.files_skipped + other.files_skipped,
            files_failed: self.files_failed + other.files_failed,
            files_interrupted: self.files_interrupted + other.files_interrupted,
            files_not_attempted: self.files_not_attempted + other.files_not_attempted,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes uploaded: {}\n\
            files uploaded: {}\n\
            files skipped (already on server): {}\n\
            files failed: {}\n\
            files interrupted: {}\n\
            files not attempted: {}",
            bytesize::ByteSize(self.bytes_uploaded),
            self.files_uploaded,
            self.files_skipped,
            self.files_failed,
            self.files_interrupted,
            self.files_not_attempted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_every_counter() {
        let a = Summary {
            bytes_uploaded: 10,
            files_uploaded: 1,
            files_skipped: 2,
            ..Default::default()
        };
        let b = Summary {
            bytes_uploaded: 5,
            files_uploaded: 1,
            files_failed: 1,
            files_interrupted: 1,
            files_not_attempted: 3,
            ..Default::default()
        };
        let total = a + b;
        assert_eq!(total.bytes_uploaded, 15);
        assert_eq!(total.files_uploaded, 2);
        assert_eq!(total.files_skipped, 2);
        assert_eq!(total.files_failed, 1);
        assert_eq!(total.files_interrupted, 1);
        assert_eq!(total.files_not_attempted, 3);
        assert_eq!(total.files_processed(), 9);
    }

    #[test]
    fn display_lists_all_outcomes() {
        let summary = Summary {
            files_uploaded: 4,
            files_skipped: 1,
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.contains("files uploaded: 4"));
        assert!(text.contains("files skipped (already on server): 1"));
        assert!(text.contains("files not attempted: 0"));
    }
}
