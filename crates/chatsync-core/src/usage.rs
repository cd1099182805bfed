use chatsync_proto::Usage;

/// Holds the latest usage report for the mounted conversation.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    latest: Option<Usage>,
}

impl UsageTracker {
    /// Start over from the value that came with the server snapshot.
    pub fn reset(&mut self, initial: Option<Usage>) {
        self.latest = initial;
    }

    pub fn record(&mut self, usage: Usage) {
        self.latest = Some(usage);
    }

    pub fn latest(&self) -> Option<&Usage> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(input: u32, output: u32) -> Usage {
        Usage {
            input_tokens: input,
            output_tokens: output,
            ..Default::default()
        }
    }

    #[test]
    fn latest_report_wins() {
        let mut tracker = UsageTracker::default();
        tracker.reset(Some(usage(10, 5)));
        assert_eq!(tracker.latest(), Some(&usage(10, 5)));

        tracker.record(usage(1, 1));
        tracker.record(usage(40, 2));
        assert_eq!(tracker.latest(), Some(&usage(40, 2)));

        tracker.reset(None);
        assert_eq!(tracker.latest(), None);
    }
}
