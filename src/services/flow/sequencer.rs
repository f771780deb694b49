use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Service,
    Date,
    Time,
    Professional,
    Details,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Service => "service",
            StepKind::Date => "date",
            StepKind::Time => "time",
            StepKind::Professional => "professional",
            StepKind::Details => "details",
        }
    }
}

/// Step layout derived from the flow mode and whether a professional can be
/// picked. Never stored: rebuild it whenever either input may have changed.
///
/// Modal: Service, Date, Time, [Professional], Details.
/// Inline: Date, Time, [Professional], Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub inline_mode: bool,
    pub professional_step: bool,
}

impl StepPlan {
    pub fn new(inline_mode: bool, professional_step: bool) -> Self {
        Self {
            inline_mode,
            professional_step,
        }
    }

    pub fn total_steps(self) -> usize {
        let base = if self.inline_mode { 3 } else { 4 };
        base + usize::from(self.professional_step)
    }

    /// Maps a 1-based step index to its logical step, `None` outside `1..=total`.
    pub fn step_at(self, index: usize) -> Option<StepKind> {
        let step = match (self.inline_mode, self.professional_step, index) {
            (false, _, 1) => StepKind::Service,
            (false, _, 2) | (true, _, 1) => StepKind::Date,
            (false, _, 3) | (true, _, 2) => StepKind::Time,
            (false, true, 4) | (true, true, 3) => StepKind::Professional,
            (false, false, 4) | (false, true, 5) => StepKind::Details,
            (true, false, 3) | (true, true, 4) => StepKind::Service,
            _ => return None,
        };
        Some(step)
    }

    pub fn steps(self) -> Vec<StepKind> {
        (1..=self.total_steps())
            .filter_map(|i| self.step_at(i))
            .collect()
    }

    pub fn is_last(self, index: usize) -> bool {
        index == self.total_steps()
    }

    pub fn clamp(self, index: usize) -> usize {
        index.clamp(1, self.total_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_steps_formula() {
        for inline_mode in [false, true] {
            for professional_step in [false, true] {
                let plan = StepPlan::new(inline_mode, professional_step);
                let base = if inline_mode { 3 } else { 4 };
                let expected = base + if professional_step { 1 } else { 0 };
                assert_eq!(plan.total_steps(), expected);
                assert_eq!(plan.steps().len(), expected);
            }
        }
    }

    #[test]
    fn test_modal_order() {
        use StepKind::*;
        assert_eq!(
            StepPlan::new(false, false).steps(),
            vec![Service, Date, Time, Details]
        );
        assert_eq!(
            StepPlan::new(false, true).steps(),
            vec![Service, Date, Time, Professional, Details]
        );
    }

    #[test]
    fn test_inline_order() {
        use StepKind::*;
        assert_eq!(StepPlan::new(true, false).steps(), vec![Date, Time, Service]);
        assert_eq!(
            StepPlan::new(true, true).steps(),
            vec![Date, Time, Professional, Service]
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let plan = StepPlan::new(true, false);
        assert_eq!(plan.step_at(0), None);
        assert_eq!(plan.step_at(4), None);
        assert_eq!(plan.clamp(0), 1);
        assert_eq!(plan.clamp(9), 3);
    }

    #[test]
    fn test_last_step_tracks_professional_step() {
        assert!(StepPlan::new(false, false).is_last(4));
        assert!(!StepPlan::new(false, true).is_last(4));
        assert!(StepPlan::new(false, true).is_last(5));
        assert!(StepPlan::new(true, false).is_last(3));
    }

    #[test]
    fn test_professional_insertion_shifts_later_steps() {
        let without = StepPlan::new(false, false);
        let with = StepPlan::new(false, true);
        assert_eq!(without.step_at(4), Some(StepKind::Details));
        assert_eq!(with.step_at(4), Some(StepKind::Professional));
        // steps before the insertion point keep their index
        for i in 1..=3 {
            assert_eq!(without.step_at(i), with.step_at(i));
        }
    }
}
