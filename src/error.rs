/// Collects `; `-separated diagnostics, e.g. the per-column anomaly notes of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorAccumulator;

    #[test]
    fn test_push_single_message() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("relative_clock_diff: 1 undefined row");

        assert_eq!(
            accumulator.take().as_deref(),
            Some("relative_clock_diff: 1 undefined row")
        );
    }

    #[test]
    fn test_push_multiple_messages_uses_separator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("winner_margin: 2 unmatched rows");
        accumulator.push("elo_diff: 1 undefined row");

        assert_eq!(
            accumulator.take().as_deref(),
            Some("winner_margin: 2 unmatched rows; elo_diff: 1 undefined row")
        );
    }

    #[test]
    fn test_take_consumes_accumulator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("note");

        assert_eq!(accumulator.take().as_deref(), Some("note"));
        assert!(accumulator.is_empty());
        assert!(accumulator.take().is_none());
    }

    #[test]
    fn test_default_is_empty() {
        let accumulator = ErrorAccumulator::default();
        assert!(accumulator.is_empty());
    }
}
